//! Sync protocol message types.
//!
//! Two message kinds carry the whole exchange: a bare table advertisement
//! and a state reply that pairs the sender's table with the concrete
//! identifiers the receiver was found to be missing. The envelope is
//! CBOR; the table bytes inside stay in their own fixed codec (see
//! `namesync_core::wire`).

use serde::{Deserialize, Serialize};

use namesync_core::SeqName;

use crate::error::{Result, SyncError};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    /// Max identifiers in `State.announced`.
    pub const MAX_ANNOUNCED: usize = 1000;
    /// Max encoded-table bytes accepted in any message.
    pub const MAX_TABLE_BYTES: usize = 1 << 20;
}

/// Sync protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Advertisement: the sender's current table.
    Digest {
        /// Protocol version for compatibility checking.
        protocol_version: u8,
        /// Encoded table.
        table: Vec<u8>,
    },

    /// State reply: the sender's table plus the identifiers the receiver
    /// is missing relative to the sender.
    State {
        /// Protocol version for compatibility checking.
        protocol_version: u8,
        /// Encoded table.
        table: Vec<u8>,
        /// Identifiers the receiver should accept.
        announced: Vec<SeqName>,
    },
}

impl SyncMessage {
    /// The protocol version stamped on this message.
    pub fn protocol_version(&self) -> u8 {
        match self {
            SyncMessage::Digest { protocol_version, .. }
            | SyncMessage::State { protocol_version, .. } => *protocol_version,
        }
    }

    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            SyncMessage::Digest { table, .. } => {
                if table.len() > limits::MAX_TABLE_BYTES {
                    return Err("table too large");
                }
            }
            SyncMessage::State { table, announced, .. } => {
                if table.len() > limits::MAX_TABLE_BYTES {
                    return Err("table too large");
                }
                if announced.len() > limits::MAX_ANNOUNCED {
                    return Err("too many announced identifiers");
                }
            }
        }
        Ok(())
    }

    /// Encode for transmission.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        Ok(buf)
    }

    /// Decode a received message.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e: ciborium::de::Error<std::io::Error>| {
            SyncError::InvalidMessage(e.to_string())
        })
    }
}
