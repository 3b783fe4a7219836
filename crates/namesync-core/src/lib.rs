//! # namesync-core
//!
//! Pure primitives for named-data set reconciliation: hierarchical names,
//! the seeded 32-bit wire hash, and the invertible counting table.
//!
//! This crate contains no I/O and no networking. Everything here is
//! deterministic computation whose outputs are part of the wire contract:
//! two nodes running independent builds must derive identical keys, cells,
//! and encodings from the same inputs.
//!
//! ## Key Types
//!
//! - [`Name`] / [`SeqName`] - producer prefixes and their sequenced
//!   identifiers
//! - [`InvertibleTable`] - the fixed-capacity counting/XOR table whose
//!   difference decodes to a symmetric set difference
//! - [`Key`] - the 32-bit hash of an identifier, the only thing the table
//!   ever stores
//!
//! ## Wire format
//!
//! [`InvertibleTable::encode`] emits 12 bytes per cell (count, key sum,
//! key check, all little-endian) compressed with zlib at the maximum
//! level; see the `wire` module.

pub mod error;
pub mod hash;
pub mod iblt;
pub mod name;
pub mod wire;

pub use error::CoreError;
pub use hash::{murmur3, murmur3_u32, CHECK_SEED};
pub use iblt::{Cell, InvertibleTable, Key, HASH_COUNT};
pub use name::{Name, SeqName};
