//! Error types for the mastering engine

use thiserror::Error;

/// Mastering error type
///
/// The DSP core itself is infallible over finite input; only buffer-shape
/// violations at the API boundary are reportable errors.
#[derive(Error, Debug)]
pub enum MasterError {
    /// Buffer size mismatch
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },
}

/// Result type for mastering operations
pub type MasterResult<T> = Result<T, MasterError>;
