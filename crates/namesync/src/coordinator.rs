//! The full-sync coordinator.
//!
//! Owns one table and one tracker (exclusively; nothing else holds a
//! mutable handle to either) and turns the three external stimuli of a
//! sync session into state changes and effects:
//!
//! - a local publication ([`FullSyncCoordinator::publish`]),
//! - prefix registration changes,
//! - a peer's encoded table arriving
//!   ([`FullSyncCoordinator::on_peer_table`]).
//!
//! Every operation runs to completion synchronously; there are no timers
//! and no hidden concurrency. Drive it from one logical thread, or wrap
//! it in the caller's own serialization if several threads must share a
//! session. The [`handle`] entry point expresses the same operations as a
//! single event-in, effects-out function for drivers that prefer message
//! passing.
//!
//! [`handle`]: FullSyncCoordinator::handle

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use namesync_core::{wire::CELL_BYTES, CoreError, InvertibleTable, Key, Name, SeqName};

use crate::error::{Result, SyncError};
use crate::tracker::{AcceptDecision, PrefixSequenceTracker};

/// Resolves a decoded table key back to the identifier that produced it.
///
/// The table stores only 32-bit hashes, so keys on the *peer's* side of a
/// difference cannot be inverted locally; the surrounding exchange
/// protocol supplies the resolution (typically from the peer's own
/// announcements). Keys that fail to resolve are reported, never guessed.
pub trait ResolveKey {
    fn resolve(&self, key: Key) -> Option<SeqName>;
}

impl ResolveKey for HashMap<Key, SeqName> {
    fn resolve(&self, key: Key) -> Option<SeqName> {
        self.get(&key).cloned()
    }
}

/// Resolves nothing. For handling a bare digest with no announcements.
impl ResolveKey for () {
    fn resolve(&self, _key: Key) -> Option<SeqName> {
        None
    }
}

/// One accepted update range, reported to the application.
///
/// Covers `low_seq..=high_seq` under `prefix`; `low_seq` is one past the
/// sequence previously known for the prefix (1 if it was unknown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqUpdate {
    pub prefix: Name,
    pub low_seq: u32,
    pub high_seq: u32,
}

/// Outcome of a local publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The sequence advanced and the table was updated.
    Published { seq: u32 },
    /// The requested sequence did not advance the tracked one.
    Rejected { current: u32 },
    /// The prefix was never added.
    UnknownPrefix,
}

/// External stimulus for [`FullSyncCoordinator::handle`].
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Publish under a registered prefix; `None` means "current + 1".
    Publish { prefix: Name, seq: Option<u32> },
    /// Register a producer prefix.
    AddPrefix { prefix: Name },
    /// Deregister a producer prefix.
    RemovePrefix { prefix: Name },
    /// A peer's encoded table, with whatever identifier announcements
    /// accompanied it.
    PeerTable {
        encoded: Bytes,
        announced: Vec<SeqName>,
    },
}

/// What an event changed and what the driver should do about it.
#[derive(Debug, Default)]
pub struct SyncEffects {
    /// Our table changed; peers should see a fresh advertisement.
    pub digest_changed: bool,
    /// Accepted update ranges, in deterministic (key-sorted) order.
    pub updates: Vec<SeqUpdate>,
    /// Identifiers the peer is missing: the reply payload.
    pub send_to_peer: Vec<SeqName>,
    /// Peer-side keys nothing could resolve this round.
    pub unresolved: Vec<Key>,
    /// Peer-side keys suppressed because they match a tracked prefix's
    /// next future publication; retried once the peer re-advertises.
    pub deferred: Vec<Key>,
}

/// Application callback for accepted updates. Invoked synchronously from
/// within peer-table handling, only with a non-empty batch.
pub type UpdateCallback = Box<dyn FnMut(&[SeqUpdate]) + Send>;

/// Orchestrates one node's side of full synchronization.
pub struct FullSyncCoordinator {
    table: InvertibleTable,
    tracker: PrefixSequenceTracker,
    on_update: Option<UpdateCallback>,
}

impl FullSyncCoordinator {
    /// Create a coordinator sized for `expected_entries` concurrently
    /// tracked publications. Peers must use the same capacity; the wire
    /// rejects mismatches.
    pub fn new(expected_entries: usize) -> Self {
        Self {
            table: InvertibleTable::new(expected_entries),
            tracker: PrefixSequenceTracker::new(),
            on_update: None,
        }
    }

    /// Install the application update callback.
    pub fn set_update_callback(&mut self, callback: UpdateCallback) {
        self.on_update = Some(callback);
    }

    /// Register a producer prefix. Returns false if already registered.
    pub fn add_prefix(&mut self, prefix: &Name) -> bool {
        self.tracker.add_prefix(prefix)
    }

    /// Deregister a prefix, erasing its table entry if it has one.
    pub fn remove_prefix(&mut self, prefix: &Name) {
        self.tracker.remove_prefix(prefix, &mut self.table);
    }

    /// Current sequence for a tracked prefix.
    pub fn current_sequence(&self, prefix: &Name) -> Option<u32> {
        self.tracker.current_sequence(prefix)
    }

    /// Publish a new sequence under a registered prefix.
    ///
    /// With `seq: None` the current sequence is incremented; an explicit
    /// value must be strictly greater than the current one. On success
    /// the superseded table entry (if any) is erased and the new one
    /// inserted; the transport should then re-advertise our digest.
    pub fn publish(&mut self, prefix: &Name, seq: Option<u32>) -> PublishOutcome {
        let Some(current) = self.tracker.current_sequence(prefix) else {
            tracing::warn!(prefix = %prefix, "publish on a prefix that was never added");
            return PublishOutcome::UnknownPrefix;
        };
        let new_seq = seq.unwrap_or(current + 1);

        match self.tracker.try_accept(prefix, new_seq) {
            AcceptDecision::Accepted { previous } => {
                self.tracker
                    .apply_update(prefix, previous, new_seq, &mut self.table);
                tracing::info!(prefix = %prefix, seq = new_seq, "published");
                PublishOutcome::Published { seq: new_seq }
            }
            AcceptDecision::Rejected { current } => PublishOutcome::Rejected { current },
        }
    }

    /// Our table in wire form, ready to advertise.
    pub fn encoded_table(&self) -> Vec<u8> {
        self.table.encode()
    }

    /// The local table.
    pub fn table(&self) -> &InvertibleTable {
        &self.table
    }

    /// The sequence tracker (read-only).
    pub fn tracker(&self) -> &PrefixSequenceTracker {
        &self.tracker
    }

    /// Reconcile against a peer's encoded table.
    ///
    /// Decodes the peer table, differences it against ours, and peels the
    /// result. Keys only we hold are resolved through our own index into
    /// the reply payload. Keys only the peer holds are filtered against
    /// every tracked prefix's next-future key (a peer querying ahead of
    /// real data is not yet trustworthy), resolved via `resolver`, and
    /// offered to the tracker; accepted ones update the table and are
    /// reported as ranges.
    ///
    /// Calling this repeatedly with an unchanged peer table is harmless:
    /// once reconciled, the difference decodes to nothing and no state
    /// moves.
    pub fn on_peer_table(
        &mut self,
        encoded: &[u8],
        resolver: &dyn ResolveKey,
    ) -> Result<SyncEffects> {
        let peer =
            InvertibleTable::decode(encoded, self.table.cell_count()).map_err(|e| match e {
                CoreError::LengthMismatch { got, .. } => SyncError::SizeMismatch {
                    local: self.table.cell_count(),
                    peer: got / CELL_BYTES,
                },
                other => SyncError::Core(other),
            })?;

        let diff = self.table.difference(&peer)?;
        let (positive, negative) = match diff.list_entries() {
            Ok(sets) => sets,
            Err(CoreError::PeelIncomplete { remaining }) => {
                tracing::warn!(remaining, "difference exceeds table capacity");
                return Err(SyncError::ReconciliationOverflow);
            }
            Err(other) => return Err(other.into()),
        };

        let mut effects = SyncEffects::default();

        for key in &positive {
            if let Some(entry) = self.tracker.resolve_local(*key) {
                effects.send_to_peer.push(entry.clone());
            }
        }

        let future_keys = self.tracker.future_keys();
        for key in negative {
            if future_keys.contains(&key) {
                tracing::debug!(key, "deferring next-future key until the peer has data");
                effects.deferred.push(key);
                continue;
            }
            let Some(entry) = resolver.resolve(key) else {
                effects.unresolved.push(key);
                continue;
            };
            if entry.key() != key {
                tracing::warn!(key, entry = %entry, "resolver returned a mismatched identifier");
                effects.unresolved.push(key);
                continue;
            }
            if let AcceptDecision::Accepted { previous } =
                self.tracker.try_accept(&entry.prefix, entry.seq)
            {
                self.tracker
                    .apply_update(&entry.prefix, previous, entry.seq, &mut self.table);
                effects.digest_changed = true;
                effects.updates.push(SeqUpdate {
                    prefix: entry.prefix,
                    low_seq: previous.unwrap_or(0) + 1,
                    high_seq: entry.seq,
                });
            }
        }

        if !effects.unresolved.is_empty() {
            tracing::debug!(count = effects.unresolved.len(), "keys left unresolved this round");
        }

        if !effects.updates.is_empty() {
            if let Some(callback) = self.on_update.as_mut() {
                callback(&effects.updates);
            }
        }

        Ok(effects)
    }

    /// Single event-in, effects-out entry point.
    pub fn handle(&mut self, event: SyncEvent) -> Result<SyncEffects> {
        match event {
            SyncEvent::Publish { prefix, seq } => {
                let mut effects = SyncEffects::default();
                if let PublishOutcome::Published { .. } = self.publish(&prefix, seq) {
                    effects.digest_changed = true;
                }
                Ok(effects)
            }
            SyncEvent::AddPrefix { prefix } => {
                self.add_prefix(&prefix);
                Ok(SyncEffects::default())
            }
            SyncEvent::RemovePrefix { prefix } => {
                let had_entry = matches!(self.current_sequence(&prefix), Some(seq) if seq != 0);
                self.remove_prefix(&prefix);
                Ok(SyncEffects {
                    digest_changed: had_entry,
                    ..SyncEffects::default()
                })
            }
            SyncEvent::PeerTable { encoded, announced } => {
                let resolver: HashMap<Key, SeqName> = announced
                    .into_iter()
                    .map(|entry| (entry.key(), entry))
                    .collect();
                self.on_peer_table(&encoded, &resolver)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn prefix(uri: &str) -> Name {
        Name::from_uri(uri)
    }

    #[test]
    fn test_publish_requires_added_prefix() {
        let mut coordinator = FullSyncCoordinator::new(10);
        assert_eq!(
            coordinator.publish(&prefix("/a"), None),
            PublishOutcome::UnknownPrefix
        );
    }

    #[test]
    fn test_publish_increments_by_default() {
        let mut coordinator = FullSyncCoordinator::new(10);
        coordinator.add_prefix(&prefix("/a"));

        assert_eq!(
            coordinator.publish(&prefix("/a"), None),
            PublishOutcome::Published { seq: 1 }
        );
        assert_eq!(
            coordinator.publish(&prefix("/a"), None),
            PublishOutcome::Published { seq: 2 }
        );
        assert_eq!(coordinator.current_sequence(&prefix("/a")), Some(2));
    }

    #[test]
    fn test_publish_rejects_stale_sequence() {
        let mut coordinator = FullSyncCoordinator::new(10);
        coordinator.add_prefix(&prefix("/a"));
        coordinator.publish(&prefix("/a"), Some(5));

        assert_eq!(
            coordinator.publish(&prefix("/a"), Some(5)),
            PublishOutcome::Rejected { current: 5 }
        );
        assert_eq!(
            coordinator.publish(&prefix("/a"), Some(3)),
            PublishOutcome::Rejected { current: 5 }
        );
    }

    #[test]
    fn test_adding_prefixes_does_not_change_encoding() {
        // Sequence zero never reaches the wire.
        let mut coordinator = FullSyncCoordinator::new(10);
        let empty = FullSyncCoordinator::new(10);

        coordinator.add_prefix(&prefix("/a"));
        coordinator.add_prefix(&prefix("/b"));
        assert_eq!(coordinator.encoded_table(), empty.encoded_table());
    }

    #[test]
    fn test_publish_replaces_previous_entry() {
        let mut coordinator = FullSyncCoordinator::new(10);
        coordinator.add_prefix(&prefix("/a"));
        coordinator.publish(&prefix("/a"), Some(5));
        coordinator.publish(&prefix("/a"), Some(6));

        let mut expected = InvertibleTable::new(10);
        expected.insert(SeqName::new(prefix("/a"), 6).key());
        assert_eq!(coordinator.table(), &expected);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let mut ours = FullSyncCoordinator::new(10);
        let mut theirs = FullSyncCoordinator::new(10);
        theirs.add_prefix(&prefix("/b"));
        theirs.publish(&prefix("/b"), Some(2));

        let resolver = theirs.tracker().key_index().clone();
        let encoded = theirs.encoded_table();

        let first = ours.on_peer_table(&encoded, &resolver).unwrap();
        assert_eq!(first.updates.len(), 1);
        assert!(first.digest_changed);

        let second = ours.on_peer_table(&encoded, &resolver).unwrap();
        assert!(second.updates.is_empty());
        assert!(second.send_to_peer.is_empty());
        assert!(!second.digest_changed);
    }

    #[test]
    fn test_peer_table_size_mismatch() {
        let mut ours = FullSyncCoordinator::new(10);
        let theirs = FullSyncCoordinator::new(40);

        let result = ours.on_peer_table(&theirs.encoded_table(), &());
        assert!(matches!(
            result,
            Err(SyncError::SizeMismatch { local: 18, peer: 60 })
        ));
    }

    #[test]
    fn test_future_key_is_deferred() {
        let mut ours = FullSyncCoordinator::new(10);
        ours.add_prefix(&prefix("/a"));

        // The peer already advertises /a at 1, exactly our next future
        // publication. Not trustworthy until the peer re-advertises.
        let mut theirs = FullSyncCoordinator::new(10);
        theirs.add_prefix(&prefix("/a"));
        theirs.publish(&prefix("/a"), Some(1));

        let resolver = theirs.tracker().key_index().clone();
        let effects = ours.on_peer_table(&theirs.encoded_table(), &resolver).unwrap();

        assert!(effects.updates.is_empty());
        assert_eq!(effects.deferred, vec![SeqName::new(prefix("/a"), 1).key()]);
        assert_eq!(ours.current_sequence(&prefix("/a")), Some(0));
        assert!(ours.table().is_empty());
    }

    #[test]
    fn test_unresolved_keys_are_reported() {
        let mut ours = FullSyncCoordinator::new(10);
        let mut theirs = FullSyncCoordinator::new(10);
        theirs.add_prefix(&prefix("/b"));
        theirs.publish(&prefix("/b"), Some(2));

        // No resolver: the key is surfaced, nothing is applied.
        let effects = ours.on_peer_table(&theirs.encoded_table(), &()).unwrap();
        assert!(effects.updates.is_empty());
        assert_eq!(effects.unresolved, vec![SeqName::new(prefix("/b"), 2).key()]);
        assert!(ours.table().is_empty());
    }

    #[test]
    fn test_update_callback_contract() {
        let seen: Arc<Mutex<Vec<Vec<SeqUpdate>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut ours = FullSyncCoordinator::new(10);
        ours.set_update_callback(Box::new(move |updates| {
            sink.lock().unwrap().push(updates.to_vec());
        }));

        let mut theirs = FullSyncCoordinator::new(10);
        theirs.add_prefix(&prefix("/b"));
        theirs.publish(&prefix("/b"), Some(2));

        let resolver = theirs.tracker().key_index().clone();
        let encoded = theirs.encoded_table();

        ours.on_peer_table(&encoded, &resolver).unwrap();
        // Re-feeding an already-reconciled table must not fire the
        // callback again.
        ours.on_peer_table(&encoded, &resolver).unwrap();

        let batches = seen.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![SeqUpdate {
                prefix: prefix("/b"),
                low_seq: 1,
                high_seq: 2,
            }]
        );
    }

    #[test]
    fn test_handle_publish_reports_digest_change() {
        let mut coordinator = FullSyncCoordinator::new(10);
        coordinator.add_prefix(&prefix("/a"));

        let effects = coordinator
            .handle(SyncEvent::Publish {
                prefix: prefix("/a"),
                seq: None,
            })
            .unwrap();
        assert!(effects.digest_changed);

        // Stale publish: no digest change.
        let effects = coordinator
            .handle(SyncEvent::Publish {
                prefix: prefix("/a"),
                seq: Some(1),
            })
            .unwrap();
        assert!(!effects.digest_changed);
    }

    #[test]
    fn test_handle_peer_table_with_announcements() {
        let mut ours = FullSyncCoordinator::new(10);
        let mut theirs = FullSyncCoordinator::new(10);
        theirs.add_prefix(&prefix("/b"));
        theirs.publish(&prefix("/b"), Some(3));

        let effects = ours
            .handle(SyncEvent::PeerTable {
                encoded: Bytes::from(theirs.encoded_table()),
                announced: vec![SeqName::new(prefix("/b"), 3)],
            })
            .unwrap();

        assert_eq!(
            effects.updates,
            vec![SeqUpdate {
                prefix: prefix("/b"),
                low_seq: 1,
                high_seq: 3,
            }]
        );
        assert_eq!(ours.current_sequence(&prefix("/b")), Some(3));
    }

    #[test]
    fn test_handle_remove_prefix_digest_change() {
        let mut coordinator = FullSyncCoordinator::new(10);
        coordinator.add_prefix(&prefix("/a"));

        // Removing a prefix still at zero leaves the table alone.
        let effects = coordinator
            .handle(SyncEvent::RemovePrefix { prefix: prefix("/a") })
            .unwrap();
        assert!(!effects.digest_changed);

        coordinator.add_prefix(&prefix("/a"));
        coordinator.publish(&prefix("/a"), None);
        let effects = coordinator
            .handle(SyncEvent::RemovePrefix { prefix: prefix("/a") })
            .unwrap();
        assert!(effects.digest_changed);
        assert!(coordinator.table().is_empty());
    }
}
