//! Feature ID (Fid) utilities and types.
//!
//! A feature ID packs the slot number and a hash of the raw feature text into
//! one unsigned 64-bit integer, so that the slot can be recovered from the id
//! alone.
//!
//! # Fid Encoding
//!
//! The encoding is decimal rather than bit based:
//!
//! ```text
//! fid = slot * 10^16 + hash
//! ```
//!
//! where `hash` is FarmHash64 of the feature text seeded with the slot. A
//! hash that does not fit below `10^16` is shifted right by 11 bits first,
//! which always brings it below `10^16`. Slot ids are therefore limited to
//! [`MAX_SLOT_ID`] so that the product stays inside `u64`.

/// A feature ID that encodes both slot and feature information.
pub type Fid = u64;

/// A slot identifier for feature slots.
pub type SlotId = u16;

/// Decimal multiplier separating the slot from the hash part of a [`Fid`].
pub const SLOT_MULTIPLIER: u64 = 10_000_000_000_000_000;

/// Right shift applied to hashes that do not fit below [`SLOT_MULTIPLIER`].
pub const HASH_OVERFLOW_SHIFT: u32 = 11;

/// Largest slot id accepted by configuration validation.
pub const MAX_SLOT_ID: SlotId = 999;

/// Reserved id of the global bias parameter.
pub const BIAS_FID: Fid = 0;

/// Hashes `text` for `slot` and packs the result into a [`Fid`].
///
/// # Examples
///
/// ```
/// use fmlearn_core::fid::{encode, extract_slot};
///
/// let fid = encode(101, "user_42");
/// assert_eq!(extract_slot(fid), 101);
/// assert_eq!(fid, encode(101, "user_42"));
/// ```
#[inline]
pub fn encode(slot: SlotId, text: &str) -> Fid {
    let hash = farmhash::hash64_with_seed(text.as_bytes(), u64::from(slot));
    pack_signature(slot, hash)
}

/// Combines a slot and a raw 64-bit hash into a [`Fid`].
///
/// Hashes at or above [`SLOT_MULTIPLIER`] are shifted right by
/// [`HASH_OVERFLOW_SHIFT`] bits before being added to the slot prefix.
///
/// # Examples
///
/// ```
/// use fmlearn_core::fid::{pack_signature, SLOT_MULTIPLIER};
///
/// assert_eq!(pack_signature(3, 7), 3 * SLOT_MULTIPLIER + 7);
/// assert_eq!(pack_signature(3, u64::MAX), 3 * SLOT_MULTIPLIER + (u64::MAX >> 11));
/// ```
#[inline]
pub fn pack_signature(slot: SlotId, hash: u64) -> Fid {
    let hash = if hash >= SLOT_MULTIPLIER {
        hash >> HASH_OVERFLOW_SHIFT
    } else {
        hash
    };
    u64::from(slot)
        .wrapping_mul(SLOT_MULTIPLIER)
        .wrapping_add(hash)
}

/// Extracts the slot number from a hashed feature ID.
#[inline]
pub fn extract_slot(fid: Fid) -> u64 {
    fid / SLOT_MULTIPLIER
}

/// Returns the hash part of a hashed feature ID.
#[inline]
pub fn extract_hash(fid: Fid) -> u64 {
    fid % SLOT_MULTIPLIER
}

/// Checks that a slot can be packed by [`encode`].
#[inline]
pub fn is_valid_slot(slot: SlotId) -> bool {
    slot <= MAX_SLOT_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_slot_prefix() {
        for slot in [1u16, 101, 102, 550, MAX_SLOT_ID] {
            for text in ["", "a", "user_123", "中文特征", "x y z"] {
                let fid = encode(slot, text);
                assert_eq!(extract_slot(fid), u64::from(slot), "slot {slot} text {text:?}");
                assert!(extract_hash(fid) < SLOT_MULTIPLIER);
            }
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(7, "item_9"), encode(7, "item_9"));
    }

    #[test]
    fn test_encode_seeds_with_slot() {
        let a = encode(101, "same_text");
        let b = encode(102, "same_text");
        assert_ne!(extract_hash(a), extract_hash(b));
    }

    #[test]
    fn test_pack_signature_overflow_policy() {
        assert_eq!(pack_signature(0, SLOT_MULTIPLIER - 1), SLOT_MULTIPLIER - 1);
        assert_eq!(pack_signature(0, SLOT_MULTIPLIER), SLOT_MULTIPLIER >> 11);
        assert_eq!(
            pack_signature(12, u64::MAX),
            12 * SLOT_MULTIPLIER + (u64::MAX >> 11)
        );
        assert!((u64::MAX >> HASH_OVERFLOW_SHIFT) < SLOT_MULTIPLIER);
    }

    #[test]
    fn test_max_slot_fits() {
        let fid = pack_signature(MAX_SLOT_ID, SLOT_MULTIPLIER - 1);
        assert_eq!(extract_slot(fid), u64::from(MAX_SLOT_ID));
        assert!(is_valid_slot(MAX_SLOT_ID));
        assert!(!is_valid_slot(MAX_SLOT_ID + 1));
    }
}
