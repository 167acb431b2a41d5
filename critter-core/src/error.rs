//! Error types for the critter engine.

use thiserror::Error;

/// Top-level error type for all fallible engine operations.
///
/// Logical no-ops (unknown emotion names, unknown actions, empty search
/// queries) are not errors and never produce one of these.
#[derive(Error, Debug)]
pub enum CritterError {
    /// The staging buffer cannot hold a subsystem blob. Nothing was written.
    #[error("Buffer too small for {subsystem}: need {required} bytes, {available} available")]
    BufferTooSmall {
        /// Which subsystem was being encoded.
        subsystem: &'static str,
        /// Bytes the blob needs.
        required: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A read would run past the end of the persisted data.
    #[error("Truncated {subsystem} data: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Which subsystem was being decoded.
        subsystem: &'static str,
        /// Bytes the read needed.
        needed: usize,
        /// Bytes actually left.
        remaining: usize,
    },

    /// Persisted data is structurally invalid.
    #[error("Malformed {subsystem} data: {reason}")]
    Malformed {
        /// Which subsystem was being decoded.
        subsystem: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Serialization failure outside the binary snapshot (JSON export).
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CritterError>;
