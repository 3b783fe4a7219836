//! # namesync-testkit
//!
//! Testing utilities for namesync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: paired coordinators with hand-driven reconciliation
//!   for deterministic exchange tests
//! - **Generators**: proptest strategies for names, sequence numbers,
//!   capacities, and key sets
//!
//! ## Fixtures
//!
//! ```rust
//! use namesync_testkit::fixtures::{publish_at, SyncFixture};
//!
//! let mut fixture = SyncFixture::new(20);
//! publish_at(&mut fixture.left, "/sensors/door", 3);
//! fixture.converge(4);
//! assert!(fixture.is_converged());
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use namesync_testkit::generators::seq_name;
//!
//! proptest! {
//!     #[test]
//!     fn keys_are_stable(entry in seq_name()) {
//!         prop_assert_eq!(entry.key(), entry.clone().key());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{publish_at, resolution_map, SyncFixture};
