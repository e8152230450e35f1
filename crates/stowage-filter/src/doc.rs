use mlua::{Function, Lua};
use parking_lot::Mutex;
use stowage_types::Status;

/// A predicate, with optional projection, applied to a document during
/// listing or iteration. `doc_size_from` gives an upper bound on the
/// projected size so the caller can size an output buffer before
/// `doc_copy` writes the actual projected bytes.
pub trait DocumentFilter: Send + Sync {
    fn accepts(&self, document: &[u8]) -> bool;

    fn doc_size_from(&self, document: &[u8]) -> usize {
        document.len()
    }

    fn doc_copy(&self, document: &[u8], out: &mut [u8]) -> usize {
        let n = document.len().min(out.len());
        out[..n].copy_from_slice(&document[..n]);
        n
    }
}

pub struct AcceptAll;

impl DocumentFilter for AcceptAll {
    fn accepts(&self, _document: &[u8]) -> bool {
        true
    }
}

pub struct LuaDocumentFilter {
    lua: Mutex<Lua>,
}

impl LuaDocumentFilter {
    pub fn new(source: &[u8]) -> Result<Self, Status> {
        let text = std::str::from_utf8(source).map_err(|_| Status::ErrInvalidFilter)?;
        let lua = Lua::new();
        lua.load(text)
            .exec()
            .map_err(|_| Status::ErrInvalidFilter)?;
        lua.globals()
            .get::<_, Function>("accept")
            .map_err(|_| Status::ErrInvalidFilter)?;
        Ok(LuaDocumentFilter { lua: Mutex::new(lua) })
    }
}

impl DocumentFilter for LuaDocumentFilter {
    fn accepts(&self, document: &[u8]) -> bool {
        let lua = self.lua.lock();
        let accept: Function = match lua.globals().get("accept") {
            Ok(f) => f,
            Err(_) => return false,
        };
        let doc_str = match lua.create_string(document) {
            Ok(s) => s,
            Err(_) => return false,
        };
        accept.call::<_, bool>(doc_str).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_projection_copies_whole_document() {
        let filter = AcceptAll;
        let doc = b"hello";
        assert_eq!(filter.doc_size_from(doc), 5);
        let mut out = [0u8; 5];
        assert_eq!(filter.doc_copy(doc, &mut out), 5);
        assert_eq!(&out, doc);
    }

    #[test]
    fn projection_truncates_to_output_buffer() {
        let filter = AcceptAll;
        let mut out = [0u8; 2];
        assert_eq!(filter.doc_copy(b"hello", &mut out), 2);
        assert_eq!(&out, b"he");
    }

    #[test]
    fn lua_filter_evaluates_script() {
        let filter =
            LuaDocumentFilter::new(b"function accept(doc) return #doc > 3 end").expect("valid");
        assert!(filter.accepts(b"hello"));
        assert!(!filter.accepts(b"hi"));
    }
}
