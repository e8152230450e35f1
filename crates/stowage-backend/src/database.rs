use async_trait::async_trait;
use stowage_filter::{DocumentFilter, KeyValueFilter};
use stowage_types::{DocumentId, Key, Mode, Status, Value};

/// One stored key's projection for a listing or iteration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: Key,
    pub value: Option<Value>,
}

/// One stored document's projection for a listing or iteration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    pub id: DocumentId,
    pub document: Option<Vec<u8>>,
}

/// Abstract operations over an opaque database. Implementations are
/// plug-ins resolved by type tag through [`crate::registry`]; two built-in
/// ones ship in [`crate::builtin`].
///
/// Methods take `&self`: concurrent invocations must be safe, and per-key
/// atomicity is each implementation's own responsibility (not provided by
/// callers of this trait).
#[async_trait]
pub trait Database: Send + Sync {
    fn supports_mode(&self, mode: Mode) -> bool;

    async fn count(&self) -> Result<u64, Status>;

    /// Atomic per-(key, value) pair, not across pairs. `NEW_ONLY` skips a
    /// pair whose key already exists; `EXIST_ONLY` skips one whose key does
    /// not; `APPEND` concatenates onto any existing value.
    async fn put(&self, mode: Mode, pairs: &[(Key, Value)]) -> Result<(), Status>;

    /// Returns one entry per requested key, in the same order, `None` for
    /// keys not present.
    async fn get(&self, mode: Mode, keys: &[Key]) -> Result<Vec<Option<Value>>, Status>;

    /// Streaming variant of `get`: invokes `callback` once per key in
    /// input order. Default implementation reduces to `get` plus a
    /// sequential callback loop; backends with genuinely incremental
    /// retrieval may override for lower latency-to-first-byte.
    async fn fetch(
        &self,
        mode: Mode,
        keys: &[Key],
        callback: &mut (dyn FnMut(&[u8], Option<&[u8]>) -> Status + Send),
    ) -> Result<Status, Status> {
        let values = self.get(mode, keys).await?;
        for (key, value) in keys.iter().zip(values.iter()) {
            let status = callback(key, value.as_deref());
            if !status.is_ok() {
                return Ok(status);
            }
        }
        Ok(Status::Ok)
    }

    async fn exists(&self, mode: Mode, keys: &[Key]) -> Result<Vec<bool>, Status> {
        let values = self.get(mode, keys).await?;
        Ok(values.iter().map(Option::is_some).collect())
    }

    async fn length(&self, mode: Mode, keys: &[Key]) -> Result<Vec<Option<u64>>, Status> {
        let values = self.get(mode, keys).await?;
        Ok(values
            .into_iter()
            .map(|value| value.map(|v| v.len() as u64))
            .collect())
    }

    async fn erase(&self, mode: Mode, keys: &[Key]) -> Result<(), Status>;

    /// Keys strictly greater than `from_key` (or `≥` under `Mode::INCLUSIVE`)
    /// in backend order, matching `filter`, up to `max` entries (`0` means
    /// unbounded).
    async fn list_keys(
        &self,
        mode: Mode,
        from_key: &[u8],
        max: u64,
        filter: &dyn KeyValueFilter,
    ) -> Result<Vec<KeyEntry>, Status>;

    async fn list_key_values(
        &self,
        mode: Mode,
        from_key: &[u8],
        max: u64,
        filter: &dyn KeyValueFilter,
    ) -> Result<Vec<KeyEntry>, Status> {
        self.list_keys(mode, from_key, max, filter).await
    }

    /// Streaming variant of `list_key_values`. Default implementation
    /// materializes the whole listing up front; a backend with a real
    /// cursor may override to stream incrementally.
    async fn iter(
        &self,
        mode: Mode,
        from_key: &[u8],
        max: u64,
        filter: &dyn KeyValueFilter,
        callback: &mut (dyn FnMut(&[u8], Option<&[u8]>) -> Status + Send),
    ) -> Result<Status, Status> {
        let entries = self.list_key_values(mode, from_key, max, filter).await?;
        for entry in entries {
            let status = callback(&entry.key, entry.value.as_deref());
            if !status.is_ok() {
                return Ok(status);
            }
        }
        Ok(Status::Ok)
    }

    async fn coll_create(&self, name: &str) -> Result<(), Status>;
    async fn coll_drop(&self, name: &str) -> Result<(), Status>;
    async fn coll_exists(&self, name: &str) -> Result<bool, Status>;
    async fn coll_size(&self, name: &str) -> Result<u64, Status>;
    async fn coll_last_id(&self, name: &str) -> Result<DocumentId, Status>;

    /// Assigns ids in `[coll_last_id(), coll_last_id() + documents.len())`,
    /// strictly increasing in input order.
    async fn doc_store(
        &self,
        mode: Mode,
        collection: &str,
        documents: &[Vec<u8>],
    ) -> Result<Vec<DocumentId>, Status>;

    /// Fails the whole call if any id is out of range, unless
    /// `Mode::UPDATE_NEW` permits extending the id set.
    async fn doc_update(
        &self,
        mode: Mode,
        collection: &str,
        updates: &[(DocumentId, Vec<u8>)],
    ) -> Result<(), Status>;

    async fn doc_load(
        &self,
        mode: Mode,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Option<Vec<u8>>>, Status>;

    async fn doc_fetch(
        &self,
        mode: Mode,
        collection: &str,
        ids: &[DocumentId],
        callback: &mut (dyn FnMut(DocumentId, Option<&[u8]>) -> Status + Send),
    ) -> Result<Status, Status> {
        let docs = self.doc_load(mode, collection, ids).await?;
        for (id, doc) in ids.iter().zip(docs.iter()) {
            let status = callback(*id, doc.as_deref());
            if !status.is_ok() {
                return Ok(status);
            }
        }
        Ok(Status::Ok)
    }

    async fn doc_length(
        &self,
        mode: Mode,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<Vec<Option<u64>>, Status> {
        let docs = self.doc_load(mode, collection, ids).await?;
        Ok(docs
            .into_iter()
            .map(|doc| doc.map(|d| d.len() as u64))
            .collect())
    }

    /// Document ids strictly greater than `from_id` (or `≥` under
    /// `Mode::INCLUSIVE`), in increasing id order, matching `filter`.
    async fn doc_list(
        &self,
        mode: Mode,
        collection: &str,
        from_id: DocumentId,
        max: u64,
        filter: &dyn DocumentFilter,
    ) -> Result<Vec<DocEntry>, Status>;

    async fn doc_iter(
        &self,
        mode: Mode,
        collection: &str,
        from_id: DocumentId,
        max: u64,
        filter: &dyn DocumentFilter,
        callback: &mut (dyn FnMut(DocumentId, Option<&[u8]>) -> Status + Send),
    ) -> Result<Status, Status> {
        let entries = self.doc_list(mode, collection, from_id, max, filter).await?;
        for entry in entries {
            let status = callback(entry.id, entry.document.as_deref());
            if !status.is_ok() {
                return Ok(status);
            }
        }
        Ok(Status::Ok)
    }

    async fn doc_erase(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<(), Status>;
}
