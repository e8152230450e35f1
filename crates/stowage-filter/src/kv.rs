use mlua::{Function, Lua};
use parking_lot::Mutex;
use stowage_types::Status;

/// A predicate, with optional shaping, applied to a stored (key, value)
/// pair during listing or iteration.
pub trait KeyValueFilter: Send + Sync {
    fn accepts(&self, key: &[u8], value: &[u8]) -> bool;
}

pub struct AcceptAll;

impl KeyValueFilter for AcceptAll {
    fn accepts(&self, _key: &[u8], _value: &[u8]) -> bool {
        true
    }
}

pub struct PrefixFilter {
    prefix: Vec<u8>,
}

impl PrefixFilter {
    pub fn new(prefix: &[u8]) -> Self {
        PrefixFilter {
            prefix: prefix.to_vec(),
        }
    }
}

impl KeyValueFilter for PrefixFilter {
    fn accepts(&self, key: &[u8], _value: &[u8]) -> bool {
        key.starts_with(&self.prefix)
    }
}

pub struct SuffixFilter {
    suffix: Vec<u8>,
}

impl SuffixFilter {
    pub fn new(suffix: &[u8]) -> Self {
        SuffixFilter {
            suffix: suffix.to_vec(),
        }
    }
}

impl KeyValueFilter for SuffixFilter {
    fn accepts(&self, key: &[u8], _value: &[u8]) -> bool {
        key.ends_with(&self.suffix)
    }
}

/// Scripted filter: the parameter blob is Lua source defining a global
/// `accept(key, value)` function returning a boolean.
pub struct LuaKeyValueFilter {
    lua: Mutex<Lua>,
}

impl LuaKeyValueFilter {
    pub fn new(source: &[u8]) -> Result<Self, Status> {
        let text = std::str::from_utf8(source).map_err(|_| Status::ErrInvalidFilter)?;
        let lua = Lua::new();
        lua.load(text)
            .exec()
            .map_err(|_| Status::ErrInvalidFilter)?;
        lua.globals()
            .get::<_, Function>("accept")
            .map_err(|_| Status::ErrInvalidFilter)?;
        Ok(LuaKeyValueFilter { lua: Mutex::new(lua) })
    }
}

impl KeyValueFilter for LuaKeyValueFilter {
    fn accepts(&self, key: &[u8], value: &[u8]) -> bool {
        let lua = self.lua.lock();
        let accept: Function = match lua.globals().get("accept") {
            Ok(f) => f,
            Err(_) => return false,
        };
        let (key_str, value_str) = match (lua.create_string(key), lua.create_string(value)) {
            (Ok(k), Ok(v)) => (k, v),
            _ => return false,
        };
        accept.call::<_, bool>((key_str, value_str)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_filter_matches_start() {
        let filter = PrefixFilter::new(b"a");
        assert!(filter.accepts(b"ab", b""));
        assert!(!filter.accepts(b"b", b""));
    }

    #[test]
    fn suffix_filter_matches_end() {
        let filter = SuffixFilter::new(b"z");
        assert!(filter.accepts(b"buzz", b""));
        assert!(!filter.accepts(b"buzy", b""));
    }

    #[test]
    fn lua_filter_evaluates_script() {
        let filter = LuaKeyValueFilter::new(b"function accept(key, value) return #key > 1 end")
            .expect("valid script");
        assert!(filter.accepts(b"ab", b"v"));
        assert!(!filter.accepts(b"a", b"v"));
    }

    #[test]
    fn lua_filter_rejects_missing_accept_function() {
        assert!(LuaKeyValueFilter::new(b"x = 1").is_err());
    }
}
