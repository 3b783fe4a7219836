//! The seeded 32-bit hash used throughout the reconciliation core.
//!
//! This is MurmurHash3 (x86, 32-bit). The exact function is part of the wire
//! contract: every communicating node must derive identical keys, partition
//! indices, and cell checksums from the same inputs, so the implementation
//! below must never change without a protocol version bump.
//!
//! Seed conventions:
//! - Seeds `0..HASH_COUNT` select the sub-table partition for each of the
//!   table's hash functions.
//! - [`CHECK_SEED`] computes both the per-cell integrity checksum and the
//!   name-to-key derivation (see [`crate::name::SeqName::key`]).

/// Seed for cell checksums and name-to-key derivation.
///
/// Any value outside the partition seed range `0..HASH_COUNT` works; 11 is
/// the value fixed by the wire contract.
pub const CHECK_SEED: u32 = 11;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Hash a byte string with the given seed.
pub fn murmur3(seed: u32, data: &[u8]) -> u32 {
    let mut h1 = seed;

    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k1 = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);

        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let mut k1: u32 = 0;
    if tail.len() >= 3 {
        k1 ^= u32::from(tail[2]) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= u32::from(tail[1]) << 8;
    }
    if !tail.is_empty() {
        k1 ^= u32::from(tail[0]);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u32;
    fmix32(h1)
}

/// Hash a 32-bit value with the given seed.
///
/// Hashes the little-endian byte representation, so the result matches
/// [`murmur3`] over the same four bytes.
pub fn murmur3_u32(seed: u32, value: u32) -> u32 {
    murmur3(seed, &value.to_le_bytes())
}

/// Final avalanche mix.
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published MurmurHash3 x86_32 reference vectors. These pin the wire
    // contract: if any of them changes, nodes stop interoperating.
    #[test]
    fn test_reference_vectors() {
        assert_eq!(murmur3(0, b""), 0);
        assert_eq!(murmur3(1, b""), 0x514e_28b7);
        assert_eq!(murmur3(0xffff_ffff, b""), 0x81f1_6f39);
        assert_eq!(murmur3(0, b"test"), 0xba6b_d213);
    }

    #[test]
    fn test_u32_matches_le_bytes() {
        for value in [0u32, 1, 0xdead_beef, u32::MAX] {
            assert_eq!(
                murmur3_u32(CHECK_SEED, value),
                murmur3(CHECK_SEED, &value.to_le_bytes())
            );
        }
    }

    #[test]
    fn test_seed_changes_output() {
        let a = murmur3(0, b"/node/alpha/7");
        let b = murmur3(1, b"/node/alpha/7");
        let c = murmur3(CHECK_SEED, b"/node/alpha/7");
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_deterministic() {
        let input = b"/sensors/room-4/312";
        assert_eq!(murmur3(CHECK_SEED, input), murmur3(CHECK_SEED, input));
    }
}
