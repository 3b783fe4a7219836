//! Wire codec for the invertible table.
//!
//! Must be bit-exact across implementations: for each cell in index order,
//! 12 bytes (`count` as i32 LE two's complement, then `key_sum` and
//! `key_check` as u32 LE), and the concatenation is zlib-compressed at
//! the maximum level before transmission. The receiver inflates and
//! requires exactly 12 bytes per configured cell.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::CoreError;
use crate::iblt::{Cell, InvertibleTable, HASH_COUNT};

/// Encoded size of one cell.
pub const CELL_BYTES: usize = 12;

impl InvertibleTable {
    /// Encode to the compressed wire form.
    pub fn encode(&self) -> Vec<u8> {
        let cells = self.cells();
        let mut raw = Vec::with_capacity(cells.len() * CELL_BYTES);
        for cell in cells {
            raw.extend_from_slice(&cell.count.to_le_bytes());
            raw.extend_from_slice(&cell.key_sum.to_le_bytes());
            raw.extend_from_slice(&cell.key_check.to_le_bytes());
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder
            .write_all(&raw)
            .expect("writing into a Vec cannot fail");
        encoder.finish().expect("flushing into a Vec cannot fail")
    }

    /// Decode the compressed wire form into a table of `n_cells` cells.
    ///
    /// `n_cells` is the receiver's own configured cell count; a payload
    /// that inflates to any other size is rejected, which is how a
    /// capacity mismatch between peers surfaces.
    pub fn decode(encoding: &[u8], n_cells: usize) -> Result<Self, CoreError> {
        debug_assert_eq!(n_cells % HASH_COUNT, 0);

        let mut raw = Vec::with_capacity(n_cells * CELL_BYTES);
        ZlibDecoder::new(encoding)
            .read_to_end(&mut raw)
            .map_err(|e| CoreError::CorruptEncoding(e.to_string()))?;

        if raw.len() != n_cells * CELL_BYTES {
            return Err(CoreError::LengthMismatch {
                expected: n_cells * CELL_BYTES,
                got: raw.len(),
            });
        }

        let cells = raw
            .chunks_exact(CELL_BYTES)
            .map(|chunk| Cell {
                count: i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                key_sum: u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
                key_check: u32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]),
            })
            .collect();

        Ok(InvertibleTable::from_cells(cells))
    }
}
