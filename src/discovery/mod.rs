//! File discovery

pub mod scanner;

pub use scanner::{output_path_for, scan, DiscoveredFile};
