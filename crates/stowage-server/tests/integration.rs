//! Drives a [`stowage_server::connection::serve`] loop over an in-process
//! duplex pipe, exercising the RPC surface the way a real client would:
//! frames in, frames out, no sockets involved.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use stowage_buffer::DefaultCache;
use stowage_server::connection::{serve, ProviderTable};
use stowage_server::Provider;
use stowage_types::Status;
use stowage_wire::records::{
    CountRequest, CountResponse, FetchBack, FetchRequest, FetchResponse, GetRequest, GetResponse,
    PutRequest, PutResponse,
};
use stowage_wire::{Frame, RpcId};
use tokio_util::sync::CancellationToken;

async fn client_roundtrip() -> (
    impl futures::Sink<bytes::Bytes, Error = std::io::Error> + Unpin,
    impl futures::Stream<Item = std::io::Result<bytes::BytesMut>> + Unpin,
    tokio::task::JoinHandle<Result<(), stowage_server::Error>>,
) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let config = stowage_server::ProviderConfig::from_json(
        r#"{"database": {"type": "hash_map"}, "buffer_cache": {"type": "external"}}"#,
    )
    .unwrap();
    let provider = Arc::new(
        Provider::with_buffer_cache(1, &config, Arc::new(DefaultCache)).unwrap(),
    );

    let providers = Arc::new(ProviderTable::new([provider]));
    let limit = Arc::new(tokio::sync::Semaphore::new(4));
    let stop = CancellationToken::new();
    let peer = "127.0.0.1:0".parse().unwrap();

    let handle = tokio::spawn(serve(providers, server_io, peer, stop, limit));

    let (sink, stream) = stowage_wire::framed(client_io).split();
    (sink, stream, handle)
}

#[tokio::test]
async fn put_then_get_round_trips_over_the_wire() {
    let (mut sink, mut stream, _handle) = client_roundtrip().await;

    let put = PutRequest {
        provider_id: 1,
        mode: 0,
        keys: vec![b"hello".to_vec()],
        values: vec![b"world".to_vec()],
    };
    sink.send(Frame::request(RpcId::Put, &put).encode())
        .await
        .unwrap();
    let segment = stream.next().await.unwrap().unwrap();
    let frame = Frame::decode(segment.freeze()).unwrap();
    let response: PutResponse = frame.record().unwrap();
    assert_eq!(response.status, Status::Ok.into());

    let get = GetRequest {
        provider_id: 1,
        mode: stowage_types::Mode::PACKED.bits(),
        keys: vec![b"hello".to_vec()],
        value_sizes: vec![0],
        packed_buffer_size: 64,
    };
    sink.send(Frame::request(RpcId::Get, &get).encode())
        .await
        .unwrap();
    let segment = stream.next().await.unwrap().unwrap();
    let frame = Frame::decode(segment.freeze()).unwrap();
    let response: GetResponse = frame.record().unwrap();
    assert_eq!(response.status, Status::Ok.into());
    assert_eq!(response.values, b"world".to_vec());
}

#[tokio::test]
async fn packed_get_reports_buf_too_small_once_the_aggregate_overflows() {
    let (mut sink, mut stream, _handle) = client_roundtrip().await;

    let put = PutRequest {
        provider_id: 1,
        mode: 0,
        keys: vec![b"a".to_vec(), b"bb".to_vec()],
        values: vec![b"x".to_vec(), b"yy".to_vec()],
    };
    sink.send(Frame::request(RpcId::Put, &put).encode())
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    let get = GetRequest {
        provider_id: 1,
        mode: stowage_types::Mode::PACKED.bits(),
        keys: vec![b"a".to_vec(), b"bb".to_vec()],
        value_sizes: Vec::new(),
        packed_buffer_size: 2,
    };
    sink.send(Frame::request(RpcId::Get, &get).encode())
        .await
        .unwrap();
    let segment = stream.next().await.unwrap().unwrap();
    let frame = Frame::decode(segment.freeze()).unwrap();
    let response: GetResponse = frame.record().unwrap();
    assert_eq!(response.status, Status::Ok.into());
    assert_eq!(response.value_sizes, vec![1, stowage_types::sentinel::BUF_TOO_SMALL]);
    assert_eq!(response.values, b"x".to_vec());
}

#[tokio::test]
async fn count_reflects_stored_keys() {
    let (mut sink, mut stream, _handle) = client_roundtrip().await;

    let put = PutRequest {
        provider_id: 1,
        mode: 0,
        keys: vec![b"a".to_vec(), b"b".to_vec()],
        values: vec![b"1".to_vec(), b"2".to_vec()],
    };
    sink.send(Frame::request(RpcId::Put, &put).encode())
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    sink.send(Frame::request(RpcId::Count, &CountRequest { provider_id: 1 }).encode())
        .await
        .unwrap();
    let segment = stream.next().await.unwrap().unwrap();
    let frame = Frame::decode(segment.freeze()).unwrap();
    let response: CountResponse = frame.record().unwrap();
    assert_eq!(response.status, Status::Ok.into());
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn fetch_streams_back_frames_before_the_final_response() {
    let (mut sink, mut stream, _handle) = client_roundtrip().await;

    let put = PutRequest {
        provider_id: 1,
        mode: 0,
        keys: vec![b"a".to_vec(), b"b".to_vec()],
        values: vec![b"1".to_vec(), b"2".to_vec()],
    };
    sink.send(Frame::request(RpcId::Put, &put).encode())
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    let fetch = FetchRequest {
        provider_id: 1,
        mode: 0,
        keys: vec![b"a".to_vec(), b"b".to_vec()],
        op_ref: 99,
        batch_size: 1,
    };
    sink.send(Frame::request(RpcId::Fetch, &fetch).encode())
        .await
        .unwrap();

    let first = Frame::decode(stream.next().await.unwrap().unwrap().freeze()).unwrap();
    assert_eq!(first.role, stowage_wire::FrameRole::Back);
    let back: FetchBack = first.record().unwrap();
    assert_eq!(back.op_ref, 99);

    let second = Frame::decode(stream.next().await.unwrap().unwrap().freeze()).unwrap();
    assert_eq!(second.role, stowage_wire::FrameRole::Back);

    let last = Frame::decode(stream.next().await.unwrap().unwrap().freeze()).unwrap();
    assert_eq!(last.role, stowage_wire::FrameRole::Final);
    let response: FetchResponse = last.record().unwrap();
    assert_eq!(response.status, Status::Ok.into());
}
