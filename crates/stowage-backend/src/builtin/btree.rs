use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use stowage_filter::{DocumentFilter, KeyValueFilter};
use stowage_types::{DocumentId, Key, Mode, Status, Value};

use crate::database::{DocEntry, KeyEntry};
use crate::Database;

struct Collection {
    docs: BTreeMap<DocumentId, Vec<u8>>,
    last_id: DocumentId,
}

impl Collection {
    fn new() -> Self {
        Collection {
            docs: BTreeMap::new(),
            last_id: 0,
        }
    }
}

/// Ordered (lexicographic key order) in-memory backend. Listing and
/// iteration naturally follow `BTreeMap`'s sorted order, which doubles as
/// this backend's "backend order" in the sense used by `Database::iter`
/// and `Database::doc_iter`.
///
/// `Mode::WAIT` is accepted but not honored as a true blocking wait: a
/// missing key is reported immediately rather than polled until it
/// appears. A real deployment backed by durable storage would implement
/// the wait with a notify list; this in-memory reference backend does not.
pub struct BTreeMapDatabase {
    entries: RwLock<BTreeMap<Key, Value>>,
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl BTreeMapDatabase {
    pub fn new() -> Self {
        BTreeMapDatabase {
            entries: RwLock::new(BTreeMap::new()),
            collections: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for BTreeMapDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for BTreeMapDatabase {
    fn supports_mode(&self, mode: Mode) -> bool {
        // LATEST implies backend-tracked versioning, which this backend
        // does not maintain.
        !mode.contains(Mode::LATEST)
    }

    async fn count(&self) -> Result<u64, Status> {
        Ok(self.entries.read().len() as u64)
    }

    async fn put(&self, mode: Mode, pairs: &[(Key, Value)]) -> Result<(), Status> {
        let mut entries = self.entries.write();
        for (key, value) in pairs {
            let existing = entries.get(key);
            if mode.contains(Mode::NEW_ONLY) && existing.is_some() {
                continue;
            }
            if mode.contains(Mode::EXIST_ONLY) && existing.is_none() {
                continue;
            }
            if mode.contains(Mode::APPEND) {
                entries
                    .entry(key.clone())
                    .and_modify(|v| v.extend_from_slice(value))
                    .or_insert_with(|| value.clone());
            } else {
                entries.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, mode: Mode, keys: &[Key]) -> Result<Vec<Option<Value>>, Status> {
        if mode.contains(Mode::CONSUME) {
            let mut entries = self.entries.write();
            return Ok(keys.iter().map(|key| entries.remove(key)).collect());
        }
        let entries = self.entries.read();
        Ok(keys.iter().map(|key| entries.get(key).cloned()).collect())
    }

    async fn erase(&self, _mode: Mode, keys: &[Key]) -> Result<(), Status> {
        let mut entries = self.entries.write();
        for key in keys {
            entries.remove(key);
        }
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
        let inclusive = mode.contains(Mode::INCLUSIVE);
        let limit = if max == 0 { usize::MAX } else { max as usize };
        let no_value = mode.contains(Mode::NO_VALUE);

        let mut out = Vec::new();
        for (key, value) in entries.iter() {
            let past_start = if inclusive {
                key.as_slice() >= from_key
            } else {
                key.as_slice() > from_key
            };
            if !past_start {
                continue;
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

        let mut out = Vec::new();
        for (id, document) in coll.docs.iter() {
            let past_start = if inclusive { *id >= from_id } else { *id > from_id };
            if !past_start {
                continue;
            }
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
    use stowage_filter::build_key_value_filter;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let db = BTreeMapDatabase::new();
        db.put(Mode::empty(), &[(b"a".to_vec(), b"1".to_vec())])
            .await
            .unwrap();
        let values = db.get(Mode::empty(), &[b"a".to_vec()]).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec())]);
    }

    #[tokio::test]
    async fn new_only_skips_existing_key() {
        let db = BTreeMapDatabase::new();
        db.put(Mode::empty(), &[(b"a".to_vec(), b"1".to_vec())])
            .await
            .unwrap();
        db.put(Mode::NEW_ONLY, &[(b"a".to_vec(), b"2".to_vec())])
            .await
            .unwrap();
        let values = db.get(Mode::empty(), &[b"a".to_vec()]).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec())]);
    }

    #[tokio::test]
    async fn list_keys_respects_from_key_and_filter() {
        let db = BTreeMapDatabase::new();
        db.put(
            Mode::empty(),
            &[
                (b"a".to_vec(), b"1".to_vec()),
                (b"ab".to_vec(), b"2".to_vec()),
                (b"ac".to_vec(), b"3".to_vec()),
                (b"b".to_vec(), b"4".to_vec()),
            ],
        )
        .await
        .unwrap();

        let filter = build_key_value_filter(Mode::empty(), b"a").unwrap();
        let entries = db
            .list_keys(Mode::empty(), b"", 0, filter.as_ref())
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, b"a");
    }

    #[tokio::test]
    async fn document_ids_are_monotone() {
        let db = BTreeMapDatabase::new();
        db.coll_create("c").await.unwrap();
        let ids = db
            .doc_store(Mode::empty(), "c", &[b"d1".to_vec(), b"d2".to_vec()])
            .await
            .unwrap();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(db.coll_last_id("c").await.unwrap(), 2);
    }
}
