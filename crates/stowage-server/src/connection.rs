//! Per-connection RPC dispatch: one client socket, one length-delimited
//! frame stream, one registry lookup per request, all served sequentially
//! (a connection never runs two RPCs concurrently, mirroring how a single
//! RDMA queue pair processes its operations in submission order).

use std::collections::HashMap;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use stowage_types::Status;
use stowage_wire::{Frame, RpcId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::ops;
use crate::provider::Provider;

/// All providers a listening endpoint serves, addressed by the 16-bit id
/// carried in every request record.
#[derive(Default)]
pub struct ProviderTable(HashMap<u16, Arc<Provider>>);

impl ProviderTable {
    pub fn new(providers: impl IntoIterator<Item = Arc<Provider>>) -> ProviderTable {
        ProviderTable(providers.into_iter().map(|p| (p.id, p)).collect())
    }

    pub fn get(&self, id: u16) -> Option<&Provider> {
        self.0.get(&id).map(Arc::as_ref)
    }
}

macro_rules! dispatch_final {
    ($frame:expr, $providers:expr, $tx:expr, $req_ty:ty, $resp_ty:ty, $handler:path) => {{
        let req: $req_ty = $frame.record()?;
        let response: $resp_ty = match $providers.get(req.provider_id) {
            Some(provider) => $handler(provider, req).await,
            None => <$resp_ty>::invalid_provider(),
        };
        $tx.send(Frame::final_response($frame.rpc, &response))
            .await
            .ok();
    }};
}

macro_rules! dispatch_streaming {
    ($frame:expr, $providers:expr, $tx:expr, $req_ty:ty, $resp_ty:ty, $handler:path) => {{
        let req: $req_ty = $frame.record()?;
        let response: $resp_ty = match $providers.get(req.provider_id) {
            Some(provider) => $handler(provider, req, $tx).await,
            None => <$resp_ty>::invalid_provider(),
        };
        $tx.send(Frame::final_response($frame.rpc, &response))
            .await
            .ok();
    }};
}

async fn dispatch(
    providers: &ProviderTable,
    frame: Frame,
    tx: &mpsc::Sender<Frame>,
) -> Result<(), Error> {
    use stowage_wire::records::*;

    match frame.rpc {
        RpcId::Count => dispatch_final!(frame, providers, tx, CountRequest, CountResponse, ops::data::count),
        RpcId::Put | RpcId::PutDirect => {
            dispatch_final!(frame, providers, tx, PutRequest, PutResponse, ops::data::put)
        }
        RpcId::Get | RpcId::GetDirect => {
            dispatch_final!(frame, providers, tx, GetRequest, GetResponse, ops::data::get)
        }
        RpcId::Length | RpcId::LengthDirect => {
            dispatch_final!(frame, providers, tx, LengthRequest, LengthResponse, ops::data::length)
        }
        RpcId::Exists | RpcId::ExistsDirect => {
            dispatch_final!(frame, providers, tx, ExistsRequest, ExistsResponse, ops::data::exists)
        }
        RpcId::Erase | RpcId::EraseDirect => {
            dispatch_final!(frame, providers, tx, EraseRequest, EraseResponse, ops::data::erase)
        }
        RpcId::ListKeys | RpcId::ListKeysDirect => {
            dispatch_final!(frame, providers, tx, ListKeysRequest, ListKeysResponse, ops::data::list_keys)
        }
        RpcId::ListKeyValues | RpcId::ListKeyValuesDirect => dispatch_final!(
            frame,
            providers,
            tx,
            ListKeyValuesRequest,
            ListKeyValuesResponse,
            ops::data::list_key_values
        ),
        RpcId::CollCreate => dispatch_final!(
            frame,
            providers,
            tx,
            CollCreateRequest,
            CollCreateResponse,
            ops::collection::coll_create
        ),
        RpcId::CollDrop => dispatch_final!(
            frame,
            providers,
            tx,
            CollDropRequest,
            CollDropResponse,
            ops::collection::coll_drop
        ),
        RpcId::CollExists => dispatch_final!(
            frame,
            providers,
            tx,
            CollExistsRequest,
            CollExistsResponse,
            ops::collection::coll_exists
        ),
        RpcId::CollSize => dispatch_final!(
            frame,
            providers,
            tx,
            CollSizeRequest,
            CollSizeResponse,
            ops::collection::coll_size
        ),
        RpcId::CollLastId => dispatch_final!(
            frame,
            providers,
            tx,
            CollLastIdRequest,
            CollLastIdResponse,
            ops::collection::coll_last_id
        ),
        RpcId::DocStore | RpcId::DocStoreDirect => dispatch_final!(
            frame,
            providers,
            tx,
            DocStoreRequest,
            DocStoreResponse,
            ops::document::doc_store
        ),
        RpcId::DocUpdate | RpcId::DocUpdateDirect => dispatch_final!(
            frame,
            providers,
            tx,
            DocUpdateRequest,
            DocUpdateResponse,
            ops::document::doc_update
        ),
        RpcId::DocLoad | RpcId::DocLoadDirect => dispatch_final!(
            frame,
            providers,
            tx,
            DocLoadRequest,
            DocLoadResponse,
            ops::document::doc_load
        ),
        RpcId::DocLength => dispatch_final!(
            frame,
            providers,
            tx,
            DocLengthRequest,
            DocLengthResponse,
            ops::document::doc_length
        ),
        RpcId::DocList | RpcId::DocListDirect => dispatch_final!(
            frame,
            providers,
            tx,
            DocListRequest,
            DocListResponse,
            ops::document::doc_list
        ),
        RpcId::DocErase => dispatch_final!(
            frame,
            providers,
            tx,
            DocEraseRequest,
            DocEraseResponse,
            ops::document::doc_erase
        ),
        RpcId::Fetch => {
            dispatch_streaming!(frame, providers, tx, FetchRequest, FetchResponse, ops::streaming::fetch)
        }
        RpcId::Iter => {
            dispatch_streaming!(frame, providers, tx, IterRequest, IterResponse, ops::streaming::iter)
        }
        RpcId::DocFetch => dispatch_streaming!(
            frame,
            providers,
            tx,
            DocFetchRequest,
            DocFetchResponse,
            ops::streaming::doc_fetch
        ),
        RpcId::DocIter => dispatch_streaming!(
            frame,
            providers,
            tx,
            DocIterRequest,
            DocIterResponse,
            ops::streaming::doc_iter
        ),
        RpcId::GetRemiProviderId => {
            let req: GetRemiProviderIdRequest = frame.record()?;
            let response = ops::get_remi_provider_id(req).await;
            tx.send(Frame::final_response(frame.rpc, &response))
                .await
                .ok();
        }
    }
    Ok(())
}

/// Accepts frames from `io` until the peer disconnects or `stop` fires.
/// `connection_limit` bounds how many of these may run at once across the
/// whole listener; exceeding it rejects the connection outright.
pub async fn serve<S>(
    providers: Arc<ProviderTable>,
    io: S,
    peer: std::net::SocketAddr,
    stop: CancellationToken,
    connection_limit: Arc<Semaphore>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let Ok(permit) = connection_limit.try_acquire_owned() else {
        metrics::counter!("stowage_rejected_connections").increment(1);
        tracing::warn!(%peer, "rejecting connection, limit reached");
        return Ok(());
    };

    tracing::info!(%peer, "accepted connection");
    metrics::gauge!("stowage_active_connections").increment(1.0);

    let (mut sink, mut stream) = stowage_wire::framed(io).split();
    let (tx, mut rx) = mpsc::channel::<Frame>(64);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(frame.encode()).await.is_err() {
                break;
            }
        }
    });

    let result = async {
        loop {
            tokio::select! {
                next = stream.next() => {
                    let Some(segment) = next else { return Ok(()) };
                    let frame = stowage_wire::decode_segment(segment?.freeze())?;
                    dispatch(&providers, frame, &tx).await?;
                }
                _ = stop.cancelled() => {
                    tracing::info!(%peer, "connection stopped by shutdown signal");
                    return Ok(());
                }
            }
        }
    }
    .await;

    drop(tx);
    let _ = writer.await;
    metrics::gauge!("stowage_active_connections").decrement(1.0);
    drop(permit);
    result
}

trait InvalidProviderResponse {
    fn invalid_provider() -> Self;
}

macro_rules! impl_invalid_provider {
    ($ty:ty) => {
        impl InvalidProviderResponse for $ty {
            fn invalid_provider() -> Self {
                Self {
                    status: Status::ErrInvalidProvider.into(),
                    ..Default::default()
                }
            }
        }
    };
}

impl_invalid_provider!(stowage_wire::records::CountResponse);
impl_invalid_provider!(stowage_wire::records::PutResponse);
impl_invalid_provider!(stowage_wire::records::GetResponse);
impl_invalid_provider!(stowage_wire::records::LengthResponse);
impl_invalid_provider!(stowage_wire::records::ExistsResponse);
impl_invalid_provider!(stowage_wire::records::EraseResponse);
impl_invalid_provider!(stowage_wire::records::ListKeysResponse);
impl_invalid_provider!(stowage_wire::records::ListKeyValuesResponse);
impl_invalid_provider!(stowage_wire::records::CollCreateResponse);
impl_invalid_provider!(stowage_wire::records::CollDropResponse);
impl_invalid_provider!(stowage_wire::records::CollExistsResponse);
impl_invalid_provider!(stowage_wire::records::CollSizeResponse);
impl_invalid_provider!(stowage_wire::records::CollLastIdResponse);
impl_invalid_provider!(stowage_wire::records::DocStoreResponse);
impl_invalid_provider!(stowage_wire::records::DocUpdateResponse);
impl_invalid_provider!(stowage_wire::records::DocLoadResponse);
impl_invalid_provider!(stowage_wire::records::DocLengthResponse);
impl_invalid_provider!(stowage_wire::records::DocListResponse);
impl_invalid_provider!(stowage_wire::records::DocEraseResponse);
impl_invalid_provider!(stowage_wire::records::FetchResponse);
impl_invalid_provider!(stowage_wire::records::IterResponse);
impl_invalid_provider!(stowage_wire::records::DocFetchResponse);
impl_invalid_provider!(stowage_wire::records::DocIterResponse);
