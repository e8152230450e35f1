mod btree;
mod hashmap;

pub use btree::BTreeMapDatabase;
pub use hashmap::HashMapDatabase;
