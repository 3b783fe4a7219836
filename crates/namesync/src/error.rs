//! Error types for the synchronization layer.

use thiserror::Error;

use namesync_core::CoreError;

/// Errors that can occur while reconciling with a peer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Peer's table capacity does not match ours. Fatal for the exchange;
    /// falling back to a full state transfer is the application's call.
    #[error("peer table size mismatch: local={local} cells, peer={peer} cells")]
    SizeMismatch { local: usize, peer: usize },

    /// The difference against the peer exceeded the table's peeling
    /// capacity. Incremental reconciliation cannot resolve this round;
    /// recovery is a full resync, outside this core.
    #[error("too many simultaneous differences to reconcile incrementally")]
    ReconciliationOverflow,

    /// Table algebra or codec failure.
    #[error("table error: {0}")]
    Core(#[from] CoreError),

    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
