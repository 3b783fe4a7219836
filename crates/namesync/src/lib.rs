//! # namesync
//!
//! Full set-reconciliation synchronization for named, sequence-numbered
//! data. Independent nodes discover exactly which (producer prefix,
//! sequence number) pairs they are missing relative to each other,
//! without ever transferring full state, by exchanging fixed-size
//! invertible tables and peeling their difference.
//!
//! ## Overview
//!
//! - [`PrefixSequenceTracker`] keeps per-prefix monotonic sequence
//!   counters and the forward index from table keys back to identifiers.
//! - [`FullSyncCoordinator`] owns one table and one tracker, publishes
//!   local updates, and reconciles peer tables into accepted update
//!   ranges.
//! - [`SyncSession`] drives a coordinator over a [`SyncTransport`],
//!   reacting to peer digests and state replies until the group
//!   converges.
//!
//! ## Key Properties
//!
//! - **Incremental**: each exchange carries one compressed table, sized
//!   by the configured capacity, not by the amount of synced data
//! - **Monotonic**: a producer's published counter never regresses
//! - **Idempotent**: re-processing an unchanged peer table moves nothing
//! - **Synchronous core**: no operation blocks or hides a timer; drive
//!   one coordinator from one logical thread
//!
//! ## Usage
//!
//! ```rust
//! use namesync::FullSyncCoordinator;
//! use namesync_core::Name;
//!
//! let mut node = FullSyncCoordinator::new(80);
//! let prefix = Name::from_uri("/sensors/room-4");
//! node.add_prefix(&prefix);
//! node.publish(&prefix, None);
//!
//! // Hand `node.encoded_table()` to the transport; feed peer tables
//! // back in through `node.handle(SyncEvent::PeerTable { .. })`.
//! ```

pub mod coordinator;
pub mod error;
pub mod messages;
pub mod session;
pub mod tracker;
pub mod transport;

pub use coordinator::{
    FullSyncCoordinator, PublishOutcome, ResolveKey, SeqUpdate, SyncEffects, SyncEvent,
    UpdateCallback,
};
pub use error::{Result, SyncError};
pub use messages::{limits, SyncMessage, PROTOCOL_VERSION};
pub use session::{SessionConfig, SessionReport, SyncSession};
pub use tracker::{AcceptDecision, PrefixSequenceTracker};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, NodeId, SyncTransport};
