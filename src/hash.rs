use xxhash_rust::xxh3::{xxh3_128, xxh3_64_with_seed};

/// Hashes `data` into 64 bits, mixing in `seed`. Changing any bit of either
/// input flips roughly half the output bits.
///
/// Deterministic within one deployed binary; cache keys are never persisted,
/// so the result need not be stable across releases.
pub fn hash64(data: &[u8], seed: u64) -> u64 {
    xxh3_64_with_seed(data, seed)
}

/// Hashes `data` into 128 bits of derived state, returned as
/// `(upper, lower)` halves.
pub fn hash2x64(data: &[u8]) -> (u64, u64) {
    let hash = xxh3_128(data);
    ((hash >> 64) as u64, hash as u64)
}
