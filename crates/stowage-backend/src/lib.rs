//! Abstract storage backend interface, built-in in-memory implementations,
//! and the process-wide type-tag registry that resolves a backend from a
//! provider's JSON configuration.

mod builtin;
mod database;
mod registry;

pub use builtin::{BTreeMapDatabase, HashMapDatabase};
pub use database::{DocEntry, Database, KeyEntry};
pub use registry::{build_database, register_backend};
