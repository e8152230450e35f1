use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stowage_types::{Mode, Status};
use stowage_wire::records::*;
use stowage_wire::{Frame, FrameRole, RpcId, WireDecode, WireEncode};

use crate::error::Error;
use crate::router::{ConnectionGuard, Router};

/// Controls how a streaming op dispatches the user callback across a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    /// Spawn one task per callback invocation and join the batch before
    /// moving on, instead of invoking callbacks serially on the calling task.
    pub pool: bool,
}

trait HasStatus {
    fn status(&self) -> i32;
}

macro_rules! impl_has_status {
    ($ty:ty) => {
        impl HasStatus for $ty {
            fn status(&self) -> i32 {
                self.status
            }
        }
    };
}

impl_has_status!(CountResponse);
impl_has_status!(PutResponse);
impl_has_status!(GetResponse);
impl_has_status!(LengthResponse);
impl_has_status!(ExistsResponse);
impl_has_status!(EraseResponse);
impl_has_status!(ListKeysResponse);
impl_has_status!(ListKeyValuesResponse);
impl_has_status!(CollCreateResponse);
impl_has_status!(CollDropResponse);
impl_has_status!(CollExistsResponse);
impl_has_status!(CollSizeResponse);
impl_has_status!(CollLastIdResponse);
impl_has_status!(DocStoreResponse);
impl_has_status!(DocUpdateResponse);
impl_has_status!(DocLoadResponse);
impl_has_status!(DocLengthResponse);
impl_has_status!(DocListResponse);
impl_has_status!(DocEraseResponse);
impl_has_status!(GetRemiProviderIdResponse);

/// Picks the bulk or direct wire variant of a one-shot op based on
/// `Mode::NO_RDMA`; the two share a handler server-side but are distinct
/// RPC ids since there is no true zero-copy bulk region to distinguish them
/// at a lower layer.
fn rpc_for(mode: Mode, bulk: RpcId, direct: RpcId) -> RpcId {
    if mode.contains(Mode::NO_RDMA) {
        direct
    } else {
        bulk
    }
}

/// One provider endpoint, reached through a shared [`Router`].
///
/// Every method here is synchronous from the caller's perspective, matching
/// the server's one-request-at-a-time connection model: the underlying
/// `ConnectionGuard` is held for the whole request/response exchange, so two
/// concurrent calls against the same `Client` naturally queue rather than
/// race on the wire.
pub struct Client {
    router: Router,
    addr: SocketAddr,
    provider_id: u16,
    next_op_ref: AtomicU64,
}

impl Client {
    pub fn new(router: Router, addr: SocketAddr, provider_id: u16) -> Client {
        Client {
            router,
            addr,
            provider_id,
            next_op_ref: AtomicU64::new(1),
        }
    }

    fn next_op_ref(&self) -> u64 {
        self.next_op_ref.fetch_add(1, Ordering::Relaxed)
    }

    async fn call<Req, Resp>(&self, rpc: RpcId, req: &Req) -> Result<Resp, Error>
    where
        Req: WireEncode,
        Resp: WireDecode + HasStatus,
    {
        let mut conn = self.router.acquire(self.addr).await?;
        match exchange::<Req, Resp>(&mut conn, rpc, req).await {
            Ok(resp) => Ok(resp),
            Err(err) => {
                if err.poisons_connection() {
                    conn.poison();
                }
                Err(err)
            }
        }
    }

    pub async fn count(&self) -> Result<u64, Error> {
        let resp: CountResponse = self
            .call(RpcId::Count, &CountRequest { provider_id: self.provider_id })
            .await?;
        Ok(resp.count)
    }

    pub async fn put(&self, mode: Mode, keys: Vec<Vec<u8>>, values: Vec<Vec<u8>>) -> Result<(), Error> {
        let rpc = rpc_for(mode, RpcId::Put, RpcId::PutDirect);
        let req = PutRequest { provider_id: self.provider_id, mode: mode.bits(), keys, values };
        let _: PutResponse = self.call(rpc, &req).await?;
        Ok(())
    }

    /// `value_sizes` is the per-key slot size, consulted only for a
    /// fixed-slot (non-`PACKED`) call; `packed_buffer_size` is the
    /// aggregate output budget, consulted only when `mode` carries
    /// `PACKED`.
    pub async fn get(
        &self,
        mode: Mode,
        keys: Vec<Vec<u8>>,
        value_sizes: Vec<u64>,
        packed_buffer_size: u64,
    ) -> Result<GetResponse, Error> {
        let rpc = rpc_for(mode, RpcId::Get, RpcId::GetDirect);
        let req = GetRequest {
            provider_id: self.provider_id,
            mode: mode.bits(),
            keys,
            value_sizes,
            packed_buffer_size,
        };
        self.call(rpc, &req).await
    }

    pub async fn length(&self, mode: Mode, keys: Vec<Vec<u8>>) -> Result<Vec<u64>, Error> {
        let rpc = rpc_for(mode, RpcId::Length, RpcId::LengthDirect);
        let req = LengthRequest { provider_id: self.provider_id, mode: mode.bits(), keys };
        let resp: LengthResponse = self.call(rpc, &req).await?;
        Ok(resp.value_sizes)
    }

    pub async fn exists(&self, mode: Mode, keys: Vec<Vec<u8>>) -> Result<Vec<u8>, Error> {
        let rpc = rpc_for(mode, RpcId::Exists, RpcId::ExistsDirect);
        let req = ExistsRequest { provider_id: self.provider_id, mode: mode.bits(), keys };
        let resp: ExistsResponse = self.call(rpc, &req).await?;
        Ok(resp.bitfield)
    }

    pub async fn erase(&self, mode: Mode, keys: Vec<Vec<u8>>) -> Result<(), Error> {
        let rpc = rpc_for(mode, RpcId::Erase, RpcId::EraseDirect);
        let req = EraseRequest { provider_id: self.provider_id, mode: mode.bits(), keys };
        let _: EraseResponse = self.call(rpc, &req).await?;
        Ok(())
    }

    pub async fn list_keys(
        &self,
        mode: Mode,
        from_key: Vec<u8>,
        filter_param: Vec<u8>,
        max: u64,
    ) -> Result<Vec<Vec<u8>>, Error> {
        let rpc = rpc_for(mode, RpcId::ListKeys, RpcId::ListKeysDirect);
        let req = ListKeysRequest { provider_id: self.provider_id, mode: mode.bits(), from_key, filter_param, max };
        let resp: ListKeysResponse = self.call(rpc, &req).await?;
        Ok(resp.keys)
    }

    pub async fn list_key_values(
        &self,
        mode: Mode,
        from_key: Vec<u8>,
        filter_param: Vec<u8>,
        max: u64,
    ) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), Error> {
        let rpc = rpc_for(mode, RpcId::ListKeyValues, RpcId::ListKeyValuesDirect);
        let req = ListKeyValuesRequest { provider_id: self.provider_id, mode: mode.bits(), from_key, filter_param, max };
        let resp: ListKeyValuesResponse = self.call(rpc, &req).await?;
        Ok((resp.keys, resp.values))
    }

    pub async fn coll_create(&self, name: String) -> Result<(), Error> {
        let req = CollCreateRequest { provider_id: self.provider_id, name };
        let _: CollCreateResponse = self.call(RpcId::CollCreate, &req).await?;
        Ok(())
    }

    pub async fn coll_drop(&self, name: String) -> Result<(), Error> {
        let req = CollDropRequest { provider_id: self.provider_id, name };
        let _: CollDropResponse = self.call(RpcId::CollDrop, &req).await?;
        Ok(())
    }

    pub async fn coll_exists(&self, name: String) -> Result<bool, Error> {
        let req = CollExistsRequest { provider_id: self.provider_id, name };
        let resp: CollExistsResponse = self.call(RpcId::CollExists, &req).await?;
        Ok(resp.exists)
    }

    pub async fn coll_size(&self, name: String) -> Result<u64, Error> {
        let req = CollSizeRequest { provider_id: self.provider_id, name };
        let resp: CollSizeResponse = self.call(RpcId::CollSize, &req).await?;
        Ok(resp.size)
    }

    pub async fn coll_last_id(&self, name: String) -> Result<u64, Error> {
        let req = CollLastIdRequest { provider_id: self.provider_id, name };
        let resp: CollLastIdResponse = self.call(RpcId::CollLastId, &req).await?;
        Ok(resp.last_id)
    }

    pub async fn doc_store(&self, mode: Mode, collection: String, documents: Vec<Vec<u8>>) -> Result<Vec<u64>, Error> {
        let rpc = rpc_for(mode, RpcId::DocStore, RpcId::DocStoreDirect);
        let req = DocStoreRequest { provider_id: self.provider_id, mode: mode.bits(), collection, documents };
        let resp: DocStoreResponse = self.call(rpc, &req).await?;
        Ok(resp.ids)
    }

    pub async fn doc_update(
        &self,
        mode: Mode,
        collection: String,
        ids: Vec<u64>,
        documents: Vec<Vec<u8>>,
    ) -> Result<(), Error> {
        let rpc = rpc_for(mode, RpcId::DocUpdate, RpcId::DocUpdateDirect);
        let req = DocUpdateRequest { provider_id: self.provider_id, mode: mode.bits(), collection, ids, documents };
        let _: DocUpdateResponse = self.call(rpc, &req).await?;
        Ok(())
    }

    pub async fn doc_load(&self, mode: Mode, collection: String, ids: Vec<u64>) -> Result<DocLoadResponse, Error> {
        let rpc = rpc_for(mode, RpcId::DocLoad, RpcId::DocLoadDirect);
        let req = DocLoadRequest { provider_id: self.provider_id, mode: mode.bits(), collection, ids };
        self.call(rpc, &req).await
    }

    pub async fn doc_length(&self, collection: String, ids: Vec<u64>) -> Result<Vec<u64>, Error> {
        let req = DocLengthRequest { provider_id: self.provider_id, collection, ids };
        let resp: DocLengthResponse = self.call(RpcId::DocLength, &req).await?;
        Ok(resp.sizes)
    }

    pub async fn doc_list(
        &self,
        mode: Mode,
        collection: String,
        from_id: u64,
        filter_param: Vec<u8>,
        max: u64,
    ) -> Result<(Vec<u64>, Vec<Vec<u8>>), Error> {
        let rpc = rpc_for(mode, RpcId::DocList, RpcId::DocListDirect);
        let req = DocListRequest { provider_id: self.provider_id, mode: mode.bits(), collection, from_id, filter_param, max };
        let resp: DocListResponse = self.call(rpc, &req).await?;
        Ok((resp.ids, resp.documents))
    }

    pub async fn doc_erase(&self, collection: String, ids: Vec<u64>) -> Result<(), Error> {
        let req = DocEraseRequest { provider_id: self.provider_id, collection, ids };
        let _: DocEraseResponse = self.call(RpcId::DocErase, &req).await?;
        Ok(())
    }

    pub async fn get_remi_provider_id(&self) -> Result<u16, Error> {
        let req = GetRemiProviderIdRequest { provider_id: self.provider_id };
        let resp: GetRemiProviderIdResponse = self.call(RpcId::GetRemiProviderId, &req).await?;
        Ok(resp.remi_provider_id)
    }

    /// Streams key-value pairs for `keys` in input order, invoking `callback`
    /// once per key as batches arrive. `callback` also receives the
    /// per-entry status the server resolved the key with (`Ok` or
    /// `ErrKeyNotFound`), standing in for the "sizes" the original's
    /// RDMA-bulk callback received since this transport's `fetch` has no
    /// separate size channel.
    pub async fn fetch<F>(
        &self,
        mode: Mode,
        keys: Vec<Vec<u8>>,
        batch_size: u64,
        options: StreamOptions,
        callback: F,
    ) -> Result<(), Error>
    where
        F: Fn(u64, Vec<u8>, Vec<u8>, Status) -> Status + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let op_ref = self.next_op_ref();
        let req = FetchRequest { provider_id: self.provider_id, mode: mode.bits(), keys, op_ref, batch_size };
        let mut conn = self.router.acquire(self.addr).await?;

        let outcome = async {
            conn.send(Frame::request(RpcId::Fetch, &req)).await?;
            let mut callback_error = None;
            loop {
                let frame = conn.recv().await?;
                match frame.role {
                    FrameRole::Back => {
                        let back: FetchBack = frame.record()?;
                        if callback_error.is_none() {
                            let start_index = back.start_index;
                            let jobs = back
                                .keys
                                .into_iter()
                                .zip(back.values)
                                .zip(back.statuses)
                                .enumerate()
                                .map(|(offset, ((key, value), status))| {
                                    let index = start_index + offset as u64;
                                    let callback = callback.clone();
                                    let status = Status::from(status);
                                    let job: Box<dyn FnOnce() -> Status + Send> =
                                        Box::new(move || (*callback)(index, key, value, status));
                                    (index, job)
                                })
                                .collect();
                            callback_error = run_jobs(jobs, options.pool).await;
                        }
                    }
                    FrameRole::Final => {
                        let response: FetchResponse = frame.record()?;
                        return Ok((callback_error, response.status));
                    }
                    FrameRole::Request => unreachable!("server never sends a request frame"),
                }
            }
        }
        .await;

        finish_stream(&mut conn, outcome)
    }

    /// Streams the ordered key range starting at `from_key`, invoking
    /// `callback` once per entry as batches arrive.
    pub async fn iter<F>(
        &self,
        mode: Mode,
        from_key: Vec<u8>,
        filter_param: Vec<u8>,
        max: u64,
        batch_size: u64,
        options: StreamOptions,
        callback: F,
    ) -> Result<(), Error>
    where
        F: Fn(u64, Vec<u8>, Vec<u8>) -> Status + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let op_ref = self.next_op_ref();
        let req = IterRequest {
            provider_id: self.provider_id,
            mode: mode.bits(),
            from_key,
            filter_param,
            max,
            op_ref,
            batch_size,
        };
        let mut conn = self.router.acquire(self.addr).await?;

        let outcome = async {
            conn.send(Frame::request(RpcId::Iter, &req)).await?;
            let mut callback_error = None;
            loop {
                let frame = conn.recv().await?;
                match frame.role {
                    FrameRole::Back => {
                        let back: IterBack = frame.record()?;
                        if callback_error.is_none() {
                            let start_index = back.start_index;
                            let jobs = back
                                .keys
                                .into_iter()
                                .zip(back.values)
                                .enumerate()
                                .map(|(offset, (key, value))| {
                                    let index = start_index + offset as u64;
                                    let callback = callback.clone();
                                    let job: Box<dyn FnOnce() -> Status + Send> =
                                        Box::new(move || (*callback)(index, key, value));
                                    (index, job)
                                })
                                .collect();
                            callback_error = run_jobs(jobs, options.pool).await;
                        }
                    }
                    FrameRole::Final => {
                        let response: IterResponse = frame.record()?;
                        return Ok((callback_error, response.status));
                    }
                    FrameRole::Request => unreachable!("server never sends a request frame"),
                }
            }
        }
        .await;

        finish_stream(&mut conn, outcome)
    }

    /// Streams documents for `ids` in input order.
    pub async fn doc_fetch<F>(
        &self,
        mode: Mode,
        collection: String,
        ids: Vec<u64>,
        batch_size: u64,
        options: StreamOptions,
        callback: F,
    ) -> Result<(), Error>
    where
        F: Fn(u64, u64, Vec<u8>, Status) -> Status + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let op_ref = self.next_op_ref();
        let req = DocFetchRequest {
            provider_id: self.provider_id,
            mode: mode.bits(),
            collection,
            ids,
            op_ref,
            batch_size,
        };
        let mut conn = self.router.acquire(self.addr).await?;

        let outcome = async {
            conn.send(Frame::request(RpcId::DocFetch, &req)).await?;
            let mut callback_error = None;
            loop {
                let frame = conn.recv().await?;
                match frame.role {
                    FrameRole::Back => {
                        let back: DocFetchBack = frame.record()?;
                        if callback_error.is_none() {
                            let start_index = back.start_index;
                            let jobs = back
                                .ids
                                .into_iter()
                                .zip(back.documents)
                                .zip(back.statuses)
                                .enumerate()
                                .map(|(offset, ((id, document), status))| {
                                    let index = start_index + offset as u64;
                                    let callback = callback.clone();
                                    let status = Status::from(status);
                                    let job: Box<dyn FnOnce() -> Status + Send> =
                                        Box::new(move || (*callback)(index, id, document, status));
                                    (index, job)
                                })
                                .collect();
                            callback_error = run_jobs(jobs, options.pool).await;
                        }
                    }
                    FrameRole::Final => {
                        let response: DocFetchResponse = frame.record()?;
                        return Ok((callback_error, response.status));
                    }
                    FrameRole::Request => unreachable!("server never sends a request frame"),
                }
            }
        }
        .await;

        finish_stream(&mut conn, outcome)
    }

    /// Streams the ordered document-id range starting at `from_id`.
    pub async fn doc_iter<F>(
        &self,
        mode: Mode,
        collection: String,
        from_id: u64,
        filter_param: Vec<u8>,
        max: u64,
        batch_size: u64,
        options: StreamOptions,
        callback: F,
    ) -> Result<(), Error>
    where
        F: Fn(u64, u64, Vec<u8>) -> Status + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let op_ref = self.next_op_ref();
        let req = DocIterRequest {
            provider_id: self.provider_id,
            mode: mode.bits(),
            collection,
            from_id,
            filter_param,
            max,
            op_ref,
            batch_size,
        };
        let mut conn = self.router.acquire(self.addr).await?;

        let outcome = async {
            conn.send(Frame::request(RpcId::DocIter, &req)).await?;
            let mut callback_error = None;
            loop {
                let frame = conn.recv().await?;
                match frame.role {
                    FrameRole::Back => {
                        let back: DocIterBack = frame.record()?;
                        if callback_error.is_none() {
                            let start_index = back.start_index;
                            let jobs = back
                                .ids
                                .into_iter()
                                .zip(back.documents)
                                .enumerate()
                                .map(|(offset, (id, document))| {
                                    let index = start_index + offset as u64;
                                    let callback = callback.clone();
                                    let job: Box<dyn FnOnce() -> Status + Send> =
                                        Box::new(move || (*callback)(index, id, document));
                                    (index, job)
                                })
                                .collect();
                            callback_error = run_jobs(jobs, options.pool).await;
                        }
                    }
                    FrameRole::Final => {
                        let response: DocIterResponse = frame.record()?;
                        return Ok((callback_error, response.status));
                    }
                    FrameRole::Request => unreachable!("server never sends a request frame"),
                }
            }
        }
        .await;

        finish_stream(&mut conn, outcome)
    }
}

async fn exchange<Req, Resp>(conn: &mut ConnectionGuard, rpc: RpcId, req: &Req) -> Result<Resp, Error>
where
    Req: WireEncode,
    Resp: WireDecode + HasStatus,
{
    conn.send(Frame::request(rpc, req)).await?;
    let frame = conn.recv().await?;
    let response: Resp = frame.record()?;
    if response.status() != 0 {
        return Err(Error::Status(Status::from(response.status())));
    }
    Ok(response)
}

/// Turns a streaming loop's `(callback_error, final_status)` outcome into the
/// op's return, poisoning the connection on a transport-level failure.
/// A user callback's error takes precedence over the server's final status,
/// since it is the more specific signal of the two.
fn finish_stream(
    conn: &mut ConnectionGuard,
    outcome: Result<(Option<(u64, Status)>, i32), Error>,
) -> Result<(), Error> {
    match outcome {
        Ok((Some((_, status)), _)) => Err(Error::Callback(status)),
        Ok((None, status)) if status != 0 => Err(Error::Status(Status::from(status))),
        Ok((None, _)) => Ok(()),
        Err(err) => {
            if err.poisons_connection() {
                conn.poison();
            }
            Err(err)
        }
    }
}

/// Runs one job per batch entry, either serially (short-circuiting on the
/// first non-`Ok` status) or pool-dispatched via a `JoinSet` and joined
/// before the batch boundary is crossed. Either way the first error by
/// index order wins.
async fn run_jobs(
    jobs: Vec<(u64, Box<dyn FnOnce() -> Status + Send>)>,
    pool: bool,
) -> Option<(u64, Status)> {
    if !pool {
        for (index, job) in jobs {
            let status = job();
            if status != Status::Ok {
                return Some((index, status));
            }
        }
        return None;
    }

    let mut set = tokio::task::JoinSet::new();
    for (index, job) in jobs {
        set.spawn(async move { (index, job()) });
    }
    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        results.push(joined.expect("callback task panicked"));
    }
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().find(|(_, status)| *status != Status::Ok)
}
