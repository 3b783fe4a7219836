//! The invertible counting table backing set reconciliation.
//!
//! Two nodes each fold their key set into a fixed-size table of
//! count/XOR cells. Subtracting one table from the other yields a table
//! that encodes only the symmetric difference of the two key sets, and a
//! peeling pass recovers those keys exactly, without either side ever
//! transferring its full set.
//!
//! The table is partitioned into [`HASH_COUNT`] equal contiguous
//! sub-ranges, one per hash function, so independent keys spread across
//! partitions instead of piling onto a single function's buckets. Every
//! mutation goes through [`InvertibleTable::update`], which touches exactly
//! one cell per partition.

use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::hash::{murmur3_u32, CHECK_SEED};

/// A 32-bit table key, derived from an application identifier.
pub type Key = u32;

/// Number of hash functions, and therefore sub-table partitions.
pub const HASH_COUNT: usize = 3;

/// One cell of the table.
///
/// Empty when all three fields are zero. Pure when `count` is ±1 and
/// `key_check` matches the checksum of `key_sum`: then `key_sum` is
/// exactly one surviving key and the sign of `count` tells which side of
/// the difference it came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Net insertions minus erasures routed to this cell.
    pub count: i32,
    /// Running XOR of every key routed to this cell.
    pub key_sum: u32,
    /// Running XOR of each routed key's checksum.
    pub key_check: u32,
}

impl Cell {
    fn is_empty(&self) -> bool {
        self.count == 0 && self.key_sum == 0 && self.key_check == 0
    }

    fn is_pure(&self) -> bool {
        (self.count == 1 || self.count == -1)
            && self.key_check == murmur3_u32(CHECK_SEED, self.key_sum)
    }
}

/// Fixed-capacity invertible counting table.
///
/// The cell count is fixed at construction and never changes; two tables
/// can only be differenced when their cell counts match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertibleTable {
    cells: Vec<Cell>,
}

impl InvertibleTable {
    /// Allocate an empty table sized for `expected_entries` concurrent
    /// entries: 1.5x the expected count, rounded up to a multiple of
    /// [`HASH_COUNT`]. `expected_entries` must be positive.
    pub fn new(expected_entries: usize) -> Self {
        debug_assert!(expected_entries > 0, "table capacity must be positive");
        let mut n_cells = expected_entries + expected_entries / 2;
        let remainder = n_cells % HASH_COUNT;
        if remainder != 0 {
            n_cells += HASH_COUNT - remainder;
        }
        Self {
            cells: vec![Cell::default(); n_cells],
        }
    }

    pub(crate) fn from_cells(cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len() % HASH_COUNT, 0);
        Self { cells }
    }

    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    /// Add an entry for the key.
    pub fn insert(&mut self, key: Key) {
        self.update(1, key);
    }

    /// Remove the entry for the key.
    ///
    /// The caller must only erase keys it previously inserted and has not
    /// yet erased; erasing anything else silently corrupts the table's
    /// algebra and poisons later decodes. The synchronization layer keeps
    /// this total by routing every erase through its forward index.
    pub fn erase(&mut self, key: Key) {
        self.update(-1, key);
    }

    /// Apply a signed delta for the key to one cell in each partition.
    pub fn update(&mut self, delta: i32, key: Key) {
        let buckets_per_hash = self.cells.len() / HASH_COUNT;
        let check = murmur3_u32(CHECK_SEED, key);
        for i in 0..HASH_COUNT {
            let h = murmur3_u32(i as u32, key);
            let cell = &mut self.cells[i * buckets_per_hash + (h as usize % buckets_per_hash)];
            cell.count += delta;
            cell.key_sum ^= key;
            cell.key_check ^= check;
        }
    }

    /// Cell-wise subtraction: `self - other`.
    ///
    /// Because inserts and erases of disjoint keys commute, and a key
    /// present in both tables cancels out of every cell it touched, the
    /// result encodes exactly the symmetric difference of the two key
    /// sets that produced the operands.
    pub fn difference(&self, other: &InvertibleTable) -> Result<InvertibleTable, CoreError> {
        if self.cells.len() != other.cells.len() {
            return Err(CoreError::SizeMismatch {
                ours: self.cells.len(),
                theirs: other.cells.len(),
            });
        }
        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(a, b)| Cell {
                count: a.count - b.count,
                key_sum: a.key_sum ^ b.key_sum,
                key_check: a.key_check ^ b.key_check,
            })
            .collect();
        Ok(InvertibleTable { cells })
    }

    /// Decode the table into its surviving keys by peeling.
    ///
    /// Intended for a difference table: keys with positive count were in
    /// the minuend only, keys with negative count in the subtrahend only.
    /// Repeatedly extracts pure cells and backs their key out of the other
    /// cells it touched until a full scan peels nothing. If any cell is
    /// left non-empty the difference exceeded this table's peeling
    /// capacity and no partial result is returned.
    pub fn list_entries(&self) -> Result<(BTreeSet<Key>, BTreeSet<Key>), CoreError> {
        let mut positive = BTreeSet::new();
        let mut negative = BTreeSet::new();
        let mut peeled = self.clone();

        loop {
            let mut n_erased = 0;
            for i in 0..peeled.cells.len() {
                let cell = peeled.cells[i];
                if cell.is_pure() {
                    if cell.count == 1 {
                        positive.insert(cell.key_sum);
                    } else {
                        negative.insert(cell.key_sum);
                    }
                    peeled.update(-cell.count, cell.key_sum);
                    n_erased += 1;
                }
            }
            if n_erased == 0 {
                break;
            }
        }

        let remaining = peeled.cells.iter().filter(|c| !c.is_empty()).count();
        if remaining != 0 {
            return Err(CoreError::PeelIncomplete { remaining });
        }
        Ok((positive, negative))
    }
}
