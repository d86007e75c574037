//! Error types for patch generation and application.

use thiserror::Error;

/// Result type for BSDIFF4 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while generating or applying a patch.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from a caller-supplied reader, writer, or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The patch ended before a complete header or declared block.
    #[error("truncated patch: {0}")]
    Truncated(&'static str),

    /// The patch does not start with `"BSDIFF40"`.
    #[error("bad magic: expected \"BSDIFF40\", got {0:?}")]
    BadMagic([u8; 8]),

    /// A length field in the patch header is negative.
    #[error("negative {field} in patch header: {value}")]
    NegativeLength {
        /// Header field name.
        field: &'static str,
        /// Decoded value.
        value: i64,
    },

    /// A compressed stream reported corruption or ended mid-record.
    #[error("{stream} stream error: {source}")]
    CompressedStream {
        /// Which of the three patch streams failed.
        stream: &'static str,
        /// Underlying decoder error.
        source: std::io::Error,
    },

    /// A control triple is inconsistent with the declared output size.
    #[error("corrupt patch: {0}")]
    Corrupt(&'static str),
}
