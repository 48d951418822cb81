//! Audio decoding and encoding

pub mod decoder;
pub mod encoder;

pub use decoder::{decode, decode_with};
pub use encoder::{encoder_for, write_output, AudioEncoder, EncodeOptions};
