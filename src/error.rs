//! Error types for ZIP stream generation

use thiserror::Error;

/// Errors that can occur while generating a ZIP stream
///
/// Every variant is a caller-input or caller-protocol violation, never a
/// transient condition. Any error aborts the current pass; the stream is
/// left idle and can be retried from scratch with corrected input.
#[derive(Debug, Error)]
pub enum ZipStreamError {
    /// Encoded file name exceeds the 64 KiB limit of the ZIP format
    #[error("file name is too long: {length} bytes (max 65535)")]
    FileNameTooLong {
        /// Length of the encoded file name in bytes
        length: usize,
    },

    /// `total_size()` needs a declared size for every entry with content
    #[error("ZipEntry.size is required to calculate archive size: {name}")]
    SizeRequired {
        /// Name of the entry missing a declared size
        name: String,
    },

    /// A generation pass (streaming or size-only) is already active
    #[error("ZIP generation already in progress")]
    GenerationInProgress,

    /// A content source failed while being opened or read
    #[error("content source error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for zipstream operations
pub type Result<T> = std::result::Result<T, ZipStreamError>;
