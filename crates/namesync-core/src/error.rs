//! Error types for the reconciliation core.

use thiserror::Error;

/// Errors from table algebra and the wire codec.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two tables of different cell counts cannot be differenced.
    #[error("table size mismatch: ours has {ours} cells, theirs has {theirs}")]
    SizeMismatch { ours: usize, theirs: usize },

    /// Peeling stalled before the table emptied: the encoded difference
    /// exceeds this table's capacity.
    #[error("peeling stalled with {remaining} undecodable cells")]
    PeelIncomplete { remaining: usize },

    /// Decompressed table payload has the wrong length for the receiver's
    /// configured cell count.
    #[error("inflated table is {got} bytes, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },

    /// The compressed payload could not be inflated.
    #[error("corrupt table encoding: {0}")]
    CorruptEncoding(String),
}
