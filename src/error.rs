//! Error types for the Magnitude library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`MagnitudeError`] enum. Every error is local, synchronous, and
//! non-retryable: the caller must fix the offending input or index state
//! before retrying the operation.
//!
//! # Examples
//!
//! ```
//! use magnitude::error::{MagnitudeError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(MagnitudeError::invalid_argument("k must be greater than zero"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Magnitude operations.
#[derive(Error, Debug)]
pub enum MagnitudeError {
    /// I/O errors (file persistence).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A vector's dimension does not match the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store or index was created with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A parameter is out of range (bad k, nlist, or nprobe).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An identifier is not present in the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An IVF index was queried or mutated before training.
    #[error("Index not trained: {0}")]
    NotTrained(String),

    /// Persisted bytes are malformed, truncated, or fail the checksum.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Persisted bytes use a format version newer than this build supports.
    #[error("Unsupported format version {found} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the header.
        found: u32,
        /// Newest version this build can read.
        supported: u32,
    },
}

/// Result type alias for operations that may fail with [`MagnitudeError`].
pub type Result<T> = std::result::Result<T, MagnitudeError>;

impl MagnitudeError {
    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        MagnitudeError::DimensionMismatch { expected, actual }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        MagnitudeError::InvalidArgument(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        MagnitudeError::NotFound(msg.into())
    }

    /// Create a new not trained error.
    pub fn not_trained<S: Into<String>>(msg: S) -> Self {
        MagnitudeError::NotTrained(msg.into())
    }

    /// Create a new corrupt data error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        MagnitudeError::CorruptData(msg.into())
    }
}
