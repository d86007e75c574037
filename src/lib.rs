#![doc = include_str!("../README.md")]

mod diff;
mod error;
mod num;
mod patch;
mod suffix;

pub use diff::{diff, diff_stream};
pub use error::{Error, Result};
pub use patch::{apply, apply_files, apply_stream};

/// Magic bytes at the start of every BSDIFF4 patch.
pub const MAGIC: &[u8; 8] = b"BSDIFF40";
