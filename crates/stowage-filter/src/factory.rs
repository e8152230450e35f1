use stowage_types::{Mode, Status};

use crate::doc::{AcceptAll as DocAcceptAll, DocumentFilter, LuaDocumentFilter};
use crate::kv::{AcceptAll as KvAcceptAll, KeyValueFilter, LuaKeyValueFilter, PrefixFilter, SuffixFilter};
use crate::plugin::{build_document_plugin, build_key_value_plugin};

/// Builds the key-value predicate implied by `mode`'s filter-kind bits and
/// `param`. `LUA_FILTER` and `LIB_FILTER` are mutually exclusive with
/// `SUFFIX` (enforced by [`Mode::check`]), so at most one of the three
/// branches below is reachable for any valid mode.
pub fn build_key_value_filter(
    mode: Mode,
    param: &[u8],
) -> Result<Box<dyn KeyValueFilter>, Status> {
    if mode.contains(Mode::LUA_FILTER) {
        return Ok(Box::new(LuaKeyValueFilter::new(param)?));
    }
    if mode.contains(Mode::LIB_FILTER) {
        return build_key_value_plugin(param);
    }
    if mode.contains(Mode::NO_PREFIX) {
        return Ok(Box::new(KvAcceptAll));
    }
    if param.is_empty() {
        return Ok(Box::new(KvAcceptAll));
    }
    if mode.contains(Mode::SUFFIX) {
        Ok(Box::new(SuffixFilter::new(param)))
    } else {
        Ok(Box::new(PrefixFilter::new(param)))
    }
}

/// Document-side counterpart of [`build_key_value_filter`].
pub fn build_document_filter(
    mode: Mode,
    param: &[u8],
) -> Result<Box<dyn DocumentFilter>, Status> {
    if mode.contains(Mode::LUA_FILTER) {
        return Ok(Box::new(LuaDocumentFilter::new(param)?));
    }
    if mode.contains(Mode::LIB_FILTER) {
        return build_document_plugin(param);
    }
    Ok(Box::new(DocAcceptAll))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_param_accepts_everything() {
        let filter = build_key_value_filter(Mode::empty(), b"").unwrap();
        assert!(filter.accepts(b"anything", b""));
    }

    #[test]
    fn default_is_prefix_match() {
        let filter = build_key_value_filter(Mode::empty(), b"a").unwrap();
        assert!(filter.accepts(b"ab", b""));
        assert!(!filter.accepts(b"ba", b""));
    }

    #[test]
    fn suffix_mode_matches_end() {
        let filter = build_key_value_filter(Mode::SUFFIX, b"z").unwrap();
        assert!(filter.accepts(b"buzz", b""));
    }

    #[test]
    fn no_prefix_mode_accepts_everything() {
        let filter = build_key_value_filter(Mode::NO_PREFIX, b"a").unwrap();
        assert!(filter.accepts(b"zzz", b""));
    }
}
