//! Size-field sentinels for packed and fixed-slot output layouts.
//!
//! Rather than carrying a parallel `Option<usize>` channel, a handful of
//! reserved values at the high end of the `u64` space signal a condition
//! instead of a byte count. Any returned size greater than
//! [`LAST_VALID_SIZE`] must be treated as one of these sentinels, never as
//! bytes.

/// Threshold above which a value in a size array is a sentinel, not a byte count.
pub const LAST_VALID_SIZE: u64 = u64::MAX - 8;

/// The requested key was not present in the backend.
pub const KEY_NOT_FOUND: u64 = u64::MAX;

/// The caller-provided (or aggregate, for packed layout) buffer was too small.
pub const BUF_TOO_SMALL: u64 = u64::MAX - 1;

/// Iteration/listing has no further entries.
pub const NO_MORE_KEYS: u64 = u64::MAX - 2;

/// Returns whether `size` is one of the reserved sentinel values.
pub fn is_sentinel(size: u64) -> bool {
    size > LAST_VALID_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_above_threshold() {
        assert!(is_sentinel(KEY_NOT_FOUND));
        assert!(is_sentinel(BUF_TOO_SMALL));
        assert!(is_sentinel(NO_MORE_KEYS));
    }

    #[test]
    fn ordinary_sizes_are_not_sentinels() {
        assert!(!is_sentinel(0));
        assert!(!is_sentinel(1 << 20));
        assert!(!is_sentinel(LAST_VALID_SIZE));
    }
}
