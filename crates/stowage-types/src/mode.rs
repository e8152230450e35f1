use crate::Status;

bitflags::bitflags! {
    /// Mode is a bit field controlling semantic variants of data-plane
    /// operations. See the mutual-exclusion table enforced by
    /// [`Mode::check`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct Mode: u32 {
        /// Range/iteration includes the bound key.
        const INCLUSIVE   = 1 << 0;
        /// `put` appends to the existing value if present.
        const APPEND      = 1 << 1;
        /// Read + erase atomically per key.
        const CONSUME     = 1 << 2;
        /// Block until the key exists (bounded by transport timeout).
        const WAIT        = 1 << 3;
        /// On listing, deliver an entry even if the backend produced no value.
        const NOTFOUND    = 1 << 4;
        /// Packed outputs keep positions of missing keys.
        const KEEP_LAST   = 1 << 5;
        /// Filter parameter is interpreted as a suffix, not a prefix.
        const SUFFIX      = 1 << 6;
        /// Filter parameter is Lua source; filter engine is scripted.
        const LUA_FILTER  = 1 << 7;
        /// Filter parameter is a plug-in load spec.
        const LIB_FILTER  = 1 << 8;
        /// `list_key_values` returns only values.
        const IGNORE_KEYS = 1 << 9;
        /// `list_key_values` returns only keys.
        const KEYS_ONLY   = 1 << 10;
        /// Use the "direct" wire variant (payload inline in the request/response).
        const NO_RDMA     = 1 << 11;
        /// Skip prefix check before invoking filter.
        const NO_PREFIX   = 1 << 12;
        /// For versioned backends, return the newest version.
        const LATEST      = 1 << 13;
        /// Request/response layout is tightly packed.
        const PACKED      = 1 << 14;
        /// For `doc_update`, allow extending the set of ids.
        const UPDATE_NEW  = 1 << 15;
        /// `put` only stores if key exists.
        const EXIST_ONLY  = 1 << 16;
        /// `put` only stores if key does not exist.
        const NEW_ONLY    = 1 << 17;
        /// Iter/list do not carry values.
        const NO_VALUE    = 1 << 18;
    }
}

/// Pairs of bits that may not both be set in the same request.
const MUTUALLY_EXCLUSIVE: &[(Mode, Mode)] = &[
    (Mode::APPEND, Mode::NEW_ONLY),
    (Mode::NEW_ONLY, Mode::EXIST_ONLY),
    (Mode::SUFFIX, Mode::LUA_FILTER),
    (Mode::LIB_FILTER, Mode::SUFFIX),
    (Mode::LUA_FILTER, Mode::LIB_FILTER),
];

impl Mode {
    /// Validates that no mutually-exclusive pair of bits is set.
    ///
    /// This is the very first thing every data-plane handler does, before
    /// the backend is ever consulted.
    pub fn check(self) -> Result<(), Status> {
        for (a, b) in MUTUALLY_EXCLUSIVE {
            if self.contains(*a) && self.contains(*b) {
                return Err(Status::ErrInvalidMode);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_new_only_and_exist_only() {
        let mode = Mode::NEW_ONLY | Mode::EXIST_ONLY;
        assert_eq!(mode.check(), Err(Status::ErrInvalidMode));
    }

    #[test]
    fn rejects_append_and_new_only() {
        let mode = Mode::APPEND | Mode::NEW_ONLY;
        assert_eq!(mode.check(), Err(Status::ErrInvalidMode));
    }

    #[test]
    fn rejects_filter_kind_combinations() {
        assert!((Mode::SUFFIX | Mode::LUA_FILTER).check().is_err());
        assert!((Mode::LIB_FILTER | Mode::SUFFIX).check().is_err());
        assert!((Mode::LUA_FILTER | Mode::LIB_FILTER).check().is_err());
    }

    #[test]
    fn accepts_compatible_combinations() {
        let mode = Mode::PACKED | Mode::INCLUSIVE | Mode::WAIT;
        assert_eq!(mode.check(), Ok(()));
    }
}
