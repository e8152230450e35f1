use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use stowage_types::Status;

use crate::doc::DocumentFilter;
use crate::kv::KeyValueFilter;

type Factory<T> = Arc<dyn Fn(&[u8]) -> Result<Box<T>, Status> + Send + Sync>;

/// Process-wide, idempotent name-to-constructor table for a filter trait
/// object type. Mirrors the backend's `"foo:bar"` plug-in convention: the
/// part of the parameter blob before the first `:` names the plug-in, the
/// remainder is passed to it verbatim.
struct PluginRegistry<T: ?Sized> {
    factories: Mutex<HashMap<String, Factory<T>>>,
}

impl<T: ?Sized> PluginRegistry<T> {
    fn new() -> Self {
        PluginRegistry {
            factories: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, name: impl Into<String>, factory: Factory<T>) {
        self.factories.lock().insert(name.into(), factory);
    }

    fn build(&self, spec: &[u8]) -> Result<Box<T>, Status> {
        let (name, rest) = split_spec(spec)?;
        let factory = self
            .factories
            .lock()
            .get(name)
            .cloned()
            .ok_or(Status::ErrInvalidFilter)?;
        factory(rest)
    }
}

fn split_spec(spec: &[u8]) -> Result<(&str, &[u8]), Status> {
    let text = std::str::from_utf8(spec).map_err(|_| Status::ErrInvalidFilter)?;
    match text.find(':') {
        Some(at) => Ok((&text[..at], spec[at + 1..].as_ref())),
        None => Ok((text, &[])),
    }
}

fn key_value_registry() -> &'static PluginRegistry<dyn KeyValueFilter> {
    static REGISTRY: OnceLock<PluginRegistry<dyn KeyValueFilter>> = OnceLock::new();
    REGISTRY.get_or_init(PluginRegistry::new)
}

fn document_registry() -> &'static PluginRegistry<dyn DocumentFilter> {
    static REGISTRY: OnceLock<PluginRegistry<dyn DocumentFilter>> = OnceLock::new();
    REGISTRY.get_or_init(PluginRegistry::new)
}

pub fn register_key_value_plugin(
    name: impl Into<String>,
    factory: impl Fn(&[u8]) -> Result<Box<dyn KeyValueFilter>, Status> + Send + Sync + 'static,
) {
    key_value_registry().register(name, Arc::new(factory));
}

pub fn register_document_plugin(
    name: impl Into<String>,
    factory: impl Fn(&[u8]) -> Result<Box<dyn DocumentFilter>, Status> + Send + Sync + 'static,
) {
    document_registry().register(name, Arc::new(factory));
}

pub fn build_key_value_plugin(spec: &[u8]) -> Result<Box<dyn KeyValueFilter>, Status> {
    key_value_registry().build(spec)
}

pub fn build_document_plugin(spec: &[u8]) -> Result<Box<dyn DocumentFilter>, Status> {
    document_registry().build(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::AcceptAll;

    #[test]
    fn registers_and_builds_a_named_plugin() {
        register_key_value_plugin("always", |_spec| Ok(Box::new(AcceptAll) as Box<_>));
        let filter = build_key_value_plugin(b"always:ignored").unwrap();
        assert!(filter.accepts(b"k", b"v"));
    }

    #[test]
    fn unknown_plugin_name_is_rejected() {
        assert_eq!(
            build_key_value_plugin(b"no-such-plugin").unwrap_err(),
            Status::ErrInvalidFilter
        );
    }
}
