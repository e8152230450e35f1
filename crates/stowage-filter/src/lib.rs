//! Mode-bit-driven filter factory: builds key-value and document predicates
//! (prefix/suffix literal match, Lua scripts, or named plug-ins) from a
//! mode bitmask and an opaque parameter blob.

mod doc;
mod factory;
mod kv;
mod plugin;

pub use doc::DocumentFilter;
pub use factory::{build_document_filter, build_key_value_filter};
pub use kv::KeyValueFilter;
pub use plugin::{
    build_document_plugin, build_key_value_plugin, register_document_plugin,
    register_key_value_plugin,
};
