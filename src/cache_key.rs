//! 128-bit keys naming block cache entries.
//!
//! A key is two 64-bit words, `(session_etc64, offset_etc64)`. The value
//! space is split so keys from different producers can never meet:
//!
//! ```text
//! session_etc64 | offset_etc64  | produced by
//! --------------+---------------+------------------------------------
//!             0 |             0 | CacheKey::empty only
//!             0 |  > 0, < 1<<63 | CacheKey::mint_for_cache_lifetime
//!             0 |      >= 1<<63 | CacheKey::mint_for_process_lifetime
//!           > 0 |           any | OffsetableCacheKey::with_offset
//! ```
//!
//! Keys for SST blocks come from [`OffsetableCacheKey`], which folds the db
//! id, db session id and file number into the two words once per file open,
//! leaving the low bits of `offset_etc64` clear so that a block offset can be
//! XORed in per lookup. All keys for one file share their `session_etc64`
//! word, so the encoded session word is a usable prefix for scoping cache
//! maintenance to a single file's entries.

use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{BigEndian, ByteOrder};

use crate::bits::{floor_log2, reverse_bits};
use crate::hash::{hash2x64, hash64};
use crate::session::decode_session_id;

/// Source of ids that are unique within one cache instance.
///
/// Ids must be strictly increasing from 0 and stay below 1 << 63; a cache
/// handing out one id per nanosecond would take centuries to get there.
pub trait NewIdSource {
    fn new_id(&self) -> u64;
}

/// A 128-bit block cache key.
///
/// Plain value type: copying is free, equality and hashing are structural
/// over both words. The all-zero key is reserved as the "empty" sentinel and
/// is never minted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    session_etc64: u64,
    offset_etc64: u64,
}

impl CacheKey {
    fn new(session_etc64: u64, offset_etc64: u64) -> Self {
        Self {
            session_etc64,
            offset_etc64,
        }
    }

    /// Returns the reserved empty key, `(0, 0)`.
    pub const fn empty() -> Self {
        Self {
            session_etc64: 0,
            offset_etc64: 0,
        }
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.session_etc64 == 0 && self.offset_etc64 == 0
    }

    /// Mints a key unique among all keys minted from `cache` for its
    /// lifetime. Disjoint from every other producer's range.
    pub fn mint_for_cache_lifetime(cache: &impl NewIdSource) -> Self {
        // +1 keeps the all-zero empty sentinel unreachable.
        let id = cache.new_id() + 1;
        debug_assert_eq!(id >> 63, 0, "cache id space exhausted");
        Self::new(0, id)
    }

    /// Mints a key unique within this process lifetime.
    pub fn mint_for_process_lifetime() -> Self {
        // Counts down from u64::MAX while cache ids count up from 1, so the
        // two ranges stay disjoint. The counter orders nothing else, hence
        // relaxed.
        static COUNTER: AtomicU64 = AtomicU64::new(u64::MAX);
        let id = COUNTER.fetch_sub(1, Ordering::Relaxed);
        debug_assert_eq!(id >> 63, 1, "process id space exhausted");
        Self::new(0, id)
    }

    /// The key as 16 big-endian bytes, session word first, for caches that
    /// key on raw bytes. Keys never touch disk, so this layout is free to
    /// change between releases.
    pub fn encode(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        BigEndian::write_u64(&mut buf[..8], self.session_etc64);
        BigEndian::write_u64(&mut buf[8..], self.offset_etc64);
        buf
    }
}

/// Base key for one SST file, combined with a block offset per lookup.
///
/// Built once per file open from `(db_id, db_session_id, file_number,
/// max_offset)`; [`OffsetableCacheKey::with_offset`] then yields the cache
/// key for any byte offset in `0..=max_offset`. Immutable and freely
/// shareable across threads.
///
/// The two words pack several uniqueness sources of very different entropy:
///
/// - `session_etc64` starts as the session id's counter half, which exactly
///   distinguishes sibling files opened by one process.
/// - `offset_etc64` starts as a hash of the db id seeded with the session
///   id's nonce half, carrying the cross-process and cross-host entropy.
/// - `max_offset` decides how many whole low bytes of `file_number` (0 to 3)
///   fit into `offset_etc64` after reserving low bits for the offset. Those
///   bytes go in bit-reversed, at the top, so offsets stay collision-free
///   below. File-number overflow plus two bits recording the byte count go
///   bit-reversed into the top of `session_etc64`; the common 3-byte case
///   is encoded as zero, leaving the session word untouched.
///
/// Construction accepts every input and cannot fail; a malformed session id
/// is silently replaced by its hash.
#[derive(Clone, Copy, Debug)]
pub struct OffsetableCacheKey {
    session_etc64: u64,
    offset_etc64: u64,
    #[cfg(debug_assertions)]
    max_offset: u64,
}

impl OffsetableCacheKey {
    /// Derives the base key for a file.
    ///
    /// `max_offset` is the largest byte offset that will ever be passed to
    /// [`OffsetableCacheKey::with_offset`] for this file, typically the file
    /// size.
    pub fn new(db_id: &[u8], db_session_id: &[u8], file_number: u64, max_offset: u64) -> Self {
        let (session_upper, session_lower) = match decode_session_id(db_session_id) {
            Ok(halves) => halves,
            Err(error) => {
                // An unparseable id has already lost its structured
                // uniqueness; a hash of it is the best remaining option.
                tracing::debug!(error = %error, "Hashing malformed db session id for cache keys");
                hash2x64(db_session_id)
            }
        };
        Self::from_session_halves(session_upper, session_lower, db_id, file_number, max_offset)
    }

    fn from_session_halves(
        session_upper: u64,
        session_lower: u64,
        db_id: &[u8],
        file_number: u64,
        max_offset: u64,
    ) -> Self {
        let db_hash = hash64(db_id, session_upper);

        let mut session_etc64 = session_lower;
        let mut offset_etc64 = db_hash;

        // How many whole bytes of file_number fit at the low end of
        // offset_etc64 once every offset in 0..=max_offset has room? The OR
        // guarantees floor_log2 sees at least 2^32, capping the answer at 3.
        let file_number_bytes = (63 - floor_log2(max_offset | 0x1_0000_0000)) / 8;
        let file_number_bits = file_number_bytes * 8;
        debug_assert!(file_number_bytes <= 3);
        // A wider split must not have been possible.
        debug_assert!(
            file_number_bytes == 3
                || (max_offset << (file_number_bits + 8)) >> (file_number_bits + 8) != max_offset
        );

        // Low file-number bytes go in bit-reversed, keeping the low bits of
        // offset_etc64 clear for with_offset.
        let mask = (1u64 << file_number_bits) - 1;
        let offset_etc_modifier = reverse_bits(file_number & mask);
        debug_assert_eq!(offset_etc_modifier << file_number_bits, 0);

        // Overflowed file-number bits and the 2-bit byte count land at the
        // top of the session word, away from the counter in its low bits.
        // Recording 3 - bytes makes the common 3-byte case all zeros.
        let meta = (file_number >> file_number_bits) << 2 | u64::from(3 - file_number_bytes);
        let session_etc_modifier = reverse_bits(meta);
        debug_assert!(
            session_etc_modifier == 0
                || file_number > 0xFF_FFFF
                || max_offset > 0xFF_FFFF_FFFF
        );

        session_etc64 ^= session_etc_modifier;
        offset_etc64 ^= offset_etc_modifier;

        // Zero session words are reserved for the unique-key minters.
        if session_etc64 == 0 {
            session_etc64 = session_upper | 1;
        }
        debug_assert_ne!(session_etc64, 0);

        Self {
            session_etc64,
            offset_etc64,
            #[cfg(debug_assertions)]
            max_offset,
        }
    }

    /// The cache key for the block at `offset`, which must lie in
    /// `0..=max_offset`. `with_offset(0)` is the base key itself.
    pub fn with_offset(&self, offset: u64) -> CacheKey {
        #[cfg(debug_assertions)]
        debug_assert!(
            offset <= self.max_offset,
            "offset {offset} out of range 0..={}",
            self.max_offset
        );
        CacheKey::new(self.session_etc64, self.offset_etc64 ^ offset)
    }

    /// The 8 bytes shared by every key minted from this file: a prefix of
    /// each `with_offset(..).encode()`, usable to scope cache maintenance to
    /// this file's entries.
    pub fn common_prefix(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, self.session_etc64);
        buf
    }
}
