//! Drives a real `stowage-server` listener over loopback TCP and exercises
//! the client library against it end to end.

use std::sync::Arc;

use stowage_buffer::DefaultCache;
use stowage_client::{Client, Router, StreamOptions};
use stowage_server::connection::{serve, ProviderTable};
use stowage_server::Provider;
use stowage_types::{Mode, Status};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_provider() -> std::net::SocketAddr {
    let config = stowage_server::ProviderConfig::from_json(
        r#"{"database": {"type": "hash_map"}, "buffer_cache": {"type": "external"}}"#,
    )
    .unwrap();
    let provider = Arc::new(Provider::with_buffer_cache(1, &config, Arc::new(DefaultCache)).unwrap());
    let providers = Arc::new(ProviderTable::new([provider]));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let limit = Arc::new(tokio::sync::Semaphore::new(4));
    let stop = CancellationToken::new();

    tokio::spawn(async move {
        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            tokio::spawn(serve(providers.clone(), socket, peer, stop.clone(), limit.clone()));
        }
    });

    addr
}

#[tokio::test]
async fn put_then_get_round_trips() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    client
        .put(Mode::empty(), vec![b"hello".to_vec()], vec![b"world".to_vec()])
        .await
        .unwrap();

    let resp = client
        .get(Mode::PACKED, vec![b"hello".to_vec()], vec![], 64)
        .await
        .unwrap();
    assert_eq!(resp.values, b"world".to_vec());
}

#[tokio::test]
async fn count_reflects_stored_keys() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    client
        .put(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec()],
            vec![b"1".to_vec(), b"2".to_vec()],
        )
        .await
        .unwrap();

    assert_eq!(client.count().await.unwrap(), 2);
}

#[tokio::test]
async fn get_of_missing_key_surfaces_server_status() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    let err = client.doc_length("no-such-collection".into(), vec![1]).await.unwrap_err();
    match err {
        stowage_client::Error::Status(status) => assert_ne!(status, Status::Ok),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_invokes_callback_once_per_key_in_order() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    client
        .put(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()],
        )
        .await
        .unwrap();

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_in_callback = seen.clone();

    client
        .fetch(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"missing".to_vec()],
            2,
            StreamOptions::default(),
            move |index, key, value, status| {
                seen_in_callback.lock().unwrap().push((index, key, value, status));
                Status::Ok
            },
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], (0, b"a".to_vec(), b"1".to_vec(), Status::Ok));
    assert_eq!(seen[3].3, Status::ErrKeyNotFound);
}

#[tokio::test]
async fn fetch_callback_error_short_circuits_and_is_surfaced() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    client
        .put(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec()],
            vec![b"1".to_vec(), b"2".to_vec()],
        )
        .await
        .unwrap();

    let err = client
        .fetch(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec()],
            1,
            StreamOptions::default(),
            |_, _, _, _| Status::ErrOther,
        )
        .await
        .unwrap_err();

    match err {
        stowage_client::Error::Callback(status) => assert_eq!(status, Status::ErrOther),
        other => panic!("expected a callback error, got {other:?}"),
    }
}

#[tokio::test]
async fn iter_streams_pooled_callbacks_across_the_full_range() {
    let addr = spawn_provider().await;
    let client = Client::new(Router::new(), addr, 1);

    client
        .put(
            Mode::empty(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()],
        )
        .await
        .unwrap();

    let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let count_in_callback = count.clone();

    client
        .iter(
            Mode::empty(),
            Vec::new(),
            Vec::new(),
            0,
            2,
            StreamOptions { pool: true },
            move |_index, _key, _value| {
                count_in_callback.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Status::Ok
            },
        )
        .await
        .unwrap();

    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn router_reuses_connection_across_calls() {
    let addr = spawn_provider().await;
    let router = Router::new();
    let client = Client::new(router.clone(), addr, 1);

    client.count().await.unwrap();
    client.count().await.unwrap();

    // Only one TCP connection should ever have been dialed for this address.
    router.sweep();
}
