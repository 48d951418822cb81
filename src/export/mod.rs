//! Run report export

pub mod json;

pub use json::{read_report, write_report, RunReport};
