//! Error types for compression, decompression, and the container codec.

use thiserror::Error;

/// Error variants surfaced by the public API.
///
/// Internal invariant violations are program defects and panic with a
/// diagnostic instead of appearing here.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure reading input or writing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is longer than the index type can address.
    #[error("input too large: {size} bytes exceeds the supported maximum of {max}")]
    TooLarge { size: u64, max: u64 },

    /// The archive stream is malformed or internally inconsistent.
    #[error("corrupt archive at byte {offset}: {reason}")]
    CorruptArchive { offset: u64, reason: String },
}

/// A specialized Result type for Re-Pair operations.
pub type Result<T> = std::result::Result<T, Error>;
