//! Per-prefix sequence bookkeeping.
//!
//! Tracks the latest known publication counter for every producer prefix
//! and keeps the table in step with it: at any time the table holds at
//! most one key per tracked prefix (the key of its current (prefix, seq)
//! pair), and sequence number zero is a sentinel that never reaches the
//! table at all.
//!
//! The tracker also owns the forward index from table keys back to the
//! identifiers that produced them. The table stores nothing but 32-bit
//! hashes, so this index is the only way a decoded key becomes a concrete
//! (prefix, seq) pair again.

use std::collections::{BTreeSet, HashMap};

use namesync_core::{InvertibleTable, Key, Name, SeqName};

/// Outcome of offering a candidate sequence number to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptDecision {
    /// The candidate was newer and is now the tracked sequence.
    /// `previous` is the sequence it superseded, if the prefix was
    /// already tracked; the caller must erase that entry's key from the
    /// table before inserting the new one.
    Accepted { previous: Option<u32> },

    /// The candidate did not advance the tracked sequence.
    Rejected { current: u32 },
}

/// Monotonic sequence tracking for a set of producer prefixes.
#[derive(Debug, Default)]
pub struct PrefixSequenceTracker {
    /// Tracked prefix -> current sequence. Zero means "tracked, nothing
    /// published or observed yet".
    prefixes: HashMap<Name, u32>,
    /// Key of every entry currently in the table -> its identifier.
    key_to_name: HashMap<Key, SeqName>,
    /// Reverse of `key_to_name`.
    name_to_key: HashMap<SeqName, Key>,
}

impl PrefixSequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a prefix at sequence zero.
    ///
    /// Returns false (and does nothing) if the prefix is already tracked.
    /// The table is untouched: zero is never inserted, so that a swarm of
    /// nodes all starting at zero costs no table capacity.
    pub fn add_prefix(&mut self, prefix: &Name) -> bool {
        if self.prefixes.contains_key(prefix) {
            return false;
        }
        self.prefixes.insert(prefix.clone(), 0);
        true
    }

    /// Stop tracking a prefix, erasing its current table entry if it has
    /// one. Unknown prefixes are a no-op.
    pub fn remove_prefix(&mut self, prefix: &Name, table: &mut InvertibleTable) {
        let Some(seq) = self.prefixes.remove(prefix) else {
            return;
        };
        if seq != 0 {
            self.erase_entry(&SeqName::new(prefix.clone(), seq), table);
        }
    }

    /// Current sequence for a tracked prefix.
    pub fn current_sequence(&self, prefix: &Name) -> Option<u32> {
        self.prefixes.get(prefix).copied()
    }

    /// Whether the prefix is tracked.
    pub fn is_tracked(&self, prefix: &Name) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Offer a candidate sequence number for a prefix.
    ///
    /// Accepts if the prefix is untracked (the tracking entry is created
    /// at the candidate value) or if the candidate is strictly greater
    /// than the current sequence. A node never regresses a producer's
    /// published counter.
    pub fn try_accept(&mut self, prefix: &Name, candidate: u32) -> AcceptDecision {
        match self.prefixes.get_mut(prefix) {
            None => {
                tracing::debug!(prefix = %prefix, seq = candidate, "tracking new prefix");
                self.prefixes.insert(prefix.clone(), candidate);
                AcceptDecision::Accepted { previous: None }
            }
            Some(current) if candidate > *current => {
                tracing::debug!(prefix = %prefix, from = *current, to = candidate, "sequence advanced");
                let previous = *current;
                *current = candidate;
                AcceptDecision::Accepted {
                    previous: Some(previous),
                }
            }
            Some(current) => {
                tracing::info!(
                    prefix = %prefix,
                    current = *current,
                    candidate,
                    "ignoring stale sequence"
                );
                AcceptDecision::Rejected { current: *current }
            }
        }
    }

    /// Commit an accepted update to the table: erase the superseded entry
    /// (if any) and insert the new one, keeping the forward index exact.
    ///
    /// `previous` must be the value returned by the accepting
    /// [`try_accept`] call. Every erase goes through the index, so only
    /// keys this tracker actually inserted can ever be erased.
    ///
    /// [`try_accept`]: PrefixSequenceTracker::try_accept
    pub fn apply_update(
        &mut self,
        prefix: &Name,
        previous: Option<u32>,
        new_seq: u32,
        table: &mut InvertibleTable,
    ) {
        if let Some(old_seq) = previous {
            if old_seq != 0 {
                self.erase_entry(&SeqName::new(prefix.clone(), old_seq), table);
            }
        }
        if new_seq != 0 {
            let entry = SeqName::new(prefix.clone(), new_seq);
            let key = entry.key();
            table.insert(key);
            self.key_to_name.insert(key, entry.clone());
            self.name_to_key.insert(entry, key);
        }
    }

    /// The key this prefix's *next* publication would have.
    ///
    /// A peer whose table already contains this key is querying ahead of
    /// real data; see the coordinator's suppression of such keys.
    pub fn next_future_key(&self, prefix: &Name) -> Key {
        let current = self.current_sequence(prefix).unwrap_or(0);
        SeqName::new(prefix.clone(), current + 1).key()
    }

    /// Next-future keys for every tracked prefix.
    pub fn future_keys(&self) -> BTreeSet<Key> {
        self.prefixes
            .keys()
            .map(|prefix| self.next_future_key(prefix))
            .collect()
    }

    /// Resolve a key we previously inserted back to its identifier.
    pub fn resolve_local(&self, key: Key) -> Option<&SeqName> {
        self.key_to_name.get(&key)
    }

    /// The full forward index of currently inserted keys.
    pub fn key_index(&self) -> &HashMap<Key, SeqName> {
        &self.key_to_name
    }

    /// Iterate over tracked prefixes and their current sequences.
    pub fn iter_tracked(&self) -> impl Iterator<Item = (&Name, u32)> {
        self.prefixes.iter().map(|(name, seq)| (name, *seq))
    }

    /// Number of tracked prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether no prefixes are tracked.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    fn erase_entry(&mut self, entry: &SeqName, table: &mut InvertibleTable) {
        if let Some(key) = self.name_to_key.remove(entry) {
            self.key_to_name.remove(&key);
            table.erase(key);
        }
    }
}
