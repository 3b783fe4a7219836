//! Test fixtures and helpers.
//!
//! Common setup for reconciliation tests: a pair of same-capacity
//! coordinators that can be seeded and reconciled by hand, with key
//! resolution wired straight from each other's forward index (standing in
//! for the exchange protocol's announcements).

use std::collections::HashMap;

use namesync::{FullSyncCoordinator, SyncEffects};
use namesync_core::{Key, Name, SeqName};

/// Register a prefix (if needed) and publish a sequence under it.
pub fn publish_at(coordinator: &mut FullSyncCoordinator, uri: &str, seq: u32) {
    let prefix = Name::from_uri(uri);
    coordinator.add_prefix(&prefix);
    coordinator.publish(&prefix, Some(seq));
}

/// Snapshot of a coordinator's forward index, usable as a resolver for
/// its peer.
pub fn resolution_map(coordinator: &FullSyncCoordinator) -> HashMap<Key, SeqName> {
    coordinator.tracker().key_index().clone()
}

/// A pair of coordinators with matching capacity.
pub struct SyncFixture {
    pub left: FullSyncCoordinator,
    pub right: FullSyncCoordinator,
}

impl SyncFixture {
    /// Create a pair sized for `expected_entries`.
    pub fn new(expected_entries: usize) -> Self {
        Self {
            left: FullSyncCoordinator::new(expected_entries),
            right: FullSyncCoordinator::new(expected_entries),
        }
    }

    /// Feed the right table into the left coordinator, resolving through
    /// the right side's index.
    pub fn reconcile_left(&mut self) -> SyncEffects {
        let resolver = resolution_map(&self.right);
        self.left
            .on_peer_table(&self.right.encoded_table(), &resolver)
            .expect("reconciliation failed")
    }

    /// Feed the left table into the right coordinator, resolving through
    /// the left side's index.
    pub fn reconcile_right(&mut self) -> SyncEffects {
        let resolver = resolution_map(&self.left);
        self.right
            .on_peer_table(&self.left.encoded_table(), &resolver)
            .expect("reconciliation failed")
    }

    /// Alternate reconciliation passes until the tables match, returning
    /// the number of passes. Panics after `max_rounds` without
    /// convergence.
    pub fn converge(&mut self, max_rounds: usize) -> usize {
        for round in 0..max_rounds {
            if self.is_converged() {
                return round;
            }
            if round % 2 == 0 {
                self.reconcile_left();
            } else {
                self.reconcile_right();
            }
        }
        assert!(self.is_converged(), "no convergence after {max_rounds} rounds");
        max_rounds
    }

    /// Whether both sides encode to identical bytes.
    pub fn is_converged(&self) -> bool {
        self.left.encoded_table() == self.right.encoded_table()
    }
}
