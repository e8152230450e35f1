use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use stowage_types::Status;

use crate::builtin::{BTreeMapDatabase, HashMapDatabase};
use crate::Database;

type Factory = Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Database>, Status> + Send + Sync>;

/// Process-wide, idempotent backend type-tag registry.
///
/// A tag of the form `"foo:bar"` means "load plug-in `foo`, then look up
/// backend `bar`"; a plain `"bar"` means "built-in `bar`". Since plug-ins
/// here are ordinary Rust code registered in-process rather than resolved
/// across a dynamic-library ABI boundary, loading `foo` is a no-op: only
/// the trailing `bar` name is ever looked up. Callers that want a distinct
/// plug-in namespace should register under the fully-qualified `"foo:bar"`
/// string instead.
struct Registry {
    factories: Mutex<HashMap<String, Factory>>,
}

impl Registry {
    fn with_builtins() -> Self {
        let registry = Registry {
            factories: Mutex::new(HashMap::new()),
        };
        registry.register("hash_map", |_config| Ok(Arc::new(HashMapDatabase::new()) as Arc<_>));
        registry.register("btree_map", |_config| {
            Ok(Arc::new(BTreeMapDatabase::new()) as Arc<_>)
        });
        registry
    }

    fn register(
        &self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> Result<Arc<dyn Database>, Status> + Send + Sync + 'static,
    ) {
        self.factories.lock().insert(name.into(), Arc::new(factory));
    }

    fn build(&self, type_tag: &str, config: &serde_json::Value) -> Result<Arc<dyn Database>, Status> {
        let name = type_tag.rsplit(':').next().unwrap_or(type_tag);
        let factory = self
            .factories
            .lock()
            .get(name)
            .cloned()
            .ok_or(Status::ErrInvalidBackend)?;
        factory(config)
    }
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::with_builtins)
}

/// Registers a backend factory under `name`, available afterward both as a
/// plain tag and as the suffix of any `"plugin:name"` tag.
pub fn register_backend(
    name: impl Into<String>,
    factory: impl Fn(&serde_json::Value) -> Result<Arc<dyn Database>, Status> + Send + Sync + 'static,
) {
    registry().register(name, factory);
}

/// Builds the database named by `type_tag` (see [`Registry`]'s doc comment
/// for the tag grammar), passing it `config` as backend-specific JSON.
pub fn build_database(
    type_tag: &str,
    config: &serde_json::Value,
) -> Result<Arc<dyn Database>, Status> {
    registry().build(type_tag, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_hash_map() {
        let db = build_database("hash_map", &serde_json::json!({})).unwrap();
        assert!(db.supports_mode(stowage_types::Mode::empty()));
    }

    #[test]
    fn resolves_plugin_qualified_tag_by_suffix() {
        let db = build_database("some_plugin:btree_map", &serde_json::json!({})).unwrap();
        assert!(db.supports_mode(stowage_types::Mode::empty()));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            build_database("no-such-backend", &serde_json::json!({})).unwrap_err(),
            Status::ErrInvalidBackend
        );
    }
}
