use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use stowage_filter::{DocumentFilter, KeyValueFilter};
use stowage_types::{DocumentId, Key, Mode, Status, Value};

use crate::database::{DocEntry, KeyEntry};
use crate::Database;

struct Collection {
    docs: HashMap<DocumentId, Vec<u8>>,
    last_id: DocumentId,
}

impl Collection {
    fn new() -> Self {
        Collection {
            docs: HashMap::new(),
            last_id: 0,
        }
    }
}

/// Insertion-order in-memory backend: `list_keys`/`iter` walk keys in the
/// order they were first inserted rather than lexicographic order, giving
/// this backend a genuinely different "backend order" than
/// [`crate::builtin::BTreeMapDatabase`]. A key re-put after an `erase`
/// is treated as newly inserted.
pub struct HashMapDatabase {
    entries: RwLock<HashMap<Key, Value>>,
    order: RwLock<Vec<Key>>,
    collections: RwLock<HashMap<String, Collection>>,
}

impl HashMapDatabase {
    pub fn new() -> Self {
        HashMapDatabase {
            entries: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for HashMapDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for HashMapDatabase {
    fn supports_mode(&self, mode: Mode) -> bool {
        !mode.contains(Mode::LATEST)
    }

    async fn count(&self) -> Result<u64, Status> {
        Ok(self.entries.read().len() as u64)
    }

    async fn put(&self, mode: Mode, pairs: &[(Key, Value)]) -> Result<(), Status> {
        let mut entries = self.entries.write();
        let mut order = self.order.write();
        for (key, value) in pairs {
            let existing = entries.get(key);
            if mode.contains(Mode::NEW_ONLY) && existing.is_some() {
                continue;
            }
            if mode.contains(Mode::EXIST_ONLY) && existing.is_none() {
                continue;
            }
            let is_new = existing.is_none();
            if mode.contains(Mode::APPEND) {
                entries
                    .entry(key.clone())
                    .and_modify(|v| v.extend_from_slice(value))
                    .or_insert_with(|| value.clone());
            } else {
                entries.insert(key.clone(), value.clone());
            }
            if is_new {
                order.push(key.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, mode: Mode, keys: &[Key]) -> Result<Vec<Option<Value>>, Status> {
        if mode.contains(Mode::CONSUME) {
            let mut entries = self.entries.write();
            let mut order = self.order.write();
            let out: Vec<Option<Value>> = keys.iter().map(|key| entries.remove(key)).collect();
            order.retain(|key| entries.contains_key(key));
            return Ok(out);
        }
        let entries = self.entries.read();
        Ok(keys.iter().map(|key| entries.get(key).cloned()).collect())
    }

    async fn erase(&self, _mode: Mode, keys: &[Key]) -> Result<(), Status> {
        let mut entries = self.entries.write();
        let mut order = self.order.write();
        for key in keys {
            entries.remove(key);
        }
        order.retain(|key| entries.contains_key(key));
        Ok(())
    }

    async fn list_keys(
        &self,
        mode: Mode,
        from_key: &[u8],
        max: u64,
        filter: &dyn KeyValueFilter,
    ) -> Result<Vec<KeyEntry>, Status> {
        let entries = self.entries.read();
        let order = self.order.read();
        let inclusive = mode.contains(Mode::INCLUSIVE);
        let limit = if max == 0 { usize::MAX } else { max as usize };
        let no_value = mode.contains(Mode::NO_VALUE);

        let mut seen_from = false;
        let mut out = Vec::new();
        for key in order.iter() {
            let Some(value) = entries.get(key) else {
                continue;
            };
            if !seen_from {
                let past_start = if inclusive {
                    key.as_slice() >= from_key
                } else {
                    key.as_slice() > from_key
                };
                if !past_start {
                    continue;
                }
                seen_from = true;
            }
            if !filter.accepts(key, value) {
                continue;
            }
            out.push(KeyEntry {
                key: key.clone(),
                value: if no_value { None } else { Some(value.clone()) },
            });
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    async fn coll_create(&self, name: &str) -> Result<(), Status> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Status::ErrInvalidArgs);
        }
        collections.insert(name.to_string(), Collection::new());
        Ok(())
    }

    async fn coll_drop(&self, name: &str) -> Result<(), Status> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or(Status::ErrInvalidDatabase)
    }

    async fn coll_exists(&self, name: &str) -> Result<bool, Status> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn coll_size(&self, name: &str) -> Result<u64, Status> {
        self.collections
            .read()
            .get(name)
            .map(|coll| coll.docs.len() as u64)
            .ok_or(Status::ErrInvalidDatabase)
    }

    async fn coll_last_id(&self, name: &str) -> Result<DocumentId, Status> {
        self.collections
            .read()
            .get(name)
            .map(|coll| coll.last_id)
            .ok_or(Status::ErrInvalidDatabase)
    }

    async fn doc_store(
        &self,
        _mode: Mode,
        collection: &str,
        documents: &[Vec<u8>],
    ) -> Result<Vec<DocumentId>, Status> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or(Status::ErrInvalidDatabase)?;
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let id = coll.last_id;
            coll.docs.insert(id, document.clone());
            coll.last_id += 1;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn doc_update(
        &self,
        mode: Mode,
        collection: &str,
        updates: &[(DocumentId, Vec<u8>)],
    ) -> Result<(), Status> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or(Status::ErrInvalidDatabase)?;
        if !mode.contains(Mode::UPDATE_NEW) {
            for (id, _) in updates {
                if *id >= coll.last_id {
                    return Err(Status::ErrInvalidArgs);
                }
            }
        }
        for (id, document) in updates {
            if *id >= coll.last_id {
                coll.last_id = *id + 1;
            }
            coll.docs.insert(*id, document.clone());
        }
        Ok(())
    }

    async fn doc_load(
        &self,
        _mode: Mode,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Option<Vec<u8>>>, Status> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or(Status::ErrInvalidDatabase)?;
        Ok(ids.iter().map(|id| coll.docs.get(id).cloned()).collect())
    }

    async fn doc_list(
        &self,
        mode: Mode,
        collection: &str,
        from_id: DocumentId,
        max: u64,
        filter: &dyn DocumentFilter,
    ) -> Result<Vec<DocEntry>, Status> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or(Status::ErrInvalidDatabase)?;
        let inclusive = mode.contains(Mode::INCLUSIVE);
        let limit = if max == 0 { usize::MAX } else { max as usize };

        let mut ids: Vec<&DocumentId> = coll.docs.keys().collect();
        ids.sort_unstable();

        let mut out = Vec::new();
        for id in ids {
            let past_start = if inclusive { *id >= from_id } else { *id > from_id };
            if !past_start {
                continue;
            }
            let document = &coll.docs[id];
            if !filter.accepts(document) {
                continue;
            }
            out.push(DocEntry {
                id: *id,
                document: Some(document.clone()),
            });
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    async fn doc_erase(&self, collection: &str, ids: &[DocumentId]) -> Result<(), Status> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or(Status::ErrInvalidDatabase)?;
        for id in ids {
            coll.docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_keys_follows_insertion_order_not_lexicographic() {
        let db = HashMapDatabase::new();
        db.put(
            Mode::empty(),
            &[
                (b"b".to_vec(), b"1".to_vec()),
                (b"a".to_vec(), b"2".to_vec()),
            ],
        )
        .await
        .unwrap();

        let filter = stowage_filter::build_key_value_filter(Mode::NO_PREFIX, b"").unwrap();
        let entries = db
            .list_keys(Mode::empty(), b"", 0, filter.as_ref())
            .await
            .unwrap();
        assert_eq!(entries[0].key, b"b");
        assert_eq!(entries[1].key, b"a");
    }

    #[tokio::test]
    async fn exists_only_skips_missing_key() {
        let db = HashMapDatabase::new();
        db.put(Mode::EXIST_ONLY, &[(b"a".to_vec(), b"1".to_vec())])
            .await
            .unwrap();
        assert_eq!(db.count().await.unwrap(), 0);
    }
}
