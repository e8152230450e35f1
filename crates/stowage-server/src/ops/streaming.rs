//! Streaming data-plane ops. Each one drives a [`coroutines::try_coroutine`]
//! that resolves one batch at a time against the backend and yields a ready
//! back-RPC record; the driving loop here forwards each yielded batch over
//! `tx` and stops at the first error, mirroring the "first bad entry ends
//! the stream" rule the one-shot ops apply per key.

use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use stowage_backend::Database;
use stowage_types::{Key, Mode, Status};
use stowage_wire::records::{
    DocFetchBack, DocFetchRequest, DocFetchResponse, DocIterBack, DocIterRequest,
    DocIterResponse, FetchBack, FetchRequest, FetchResponse, IterBack, IterRequest, IterResponse,
};
use stowage_wire::{Frame, RpcId};
use tokio::sync::mpsc::Sender;

use crate::provider::{validate_mode, Provider};

pub async fn fetch(provider: &Provider, req: FetchRequest, tx: &Sender<Frame>) -> FetchResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return FetchResponse {
            status: status.into(),
        };
    }
    if let Err(status) = stowage_types::validate_keys(req.keys.iter().map(Vec::as_slice)) {
        return FetchResponse {
            status: status.into(),
        };
    }

    let batch_size = req.batch_size.max(1) as usize;
    let op_ref = req.op_ref;
    let database = provider.database.clone();
    let keys = req.keys;

    let backs = coroutines::try_coroutine(|mut co| async move {
        for (index, chunk) in keys.chunks(batch_size).enumerate() {
            let back = resolve_fetch_batch(database.as_ref(), mode, op_ref, index * batch_size, chunk).await?;
            co.yield_(back).await;
        }
        Ok(())
    });
    let mut backs = pin!(backs);

    let mut final_status = Status::Ok;
    while let Some(result) = backs.next().await {
        match result {
            Ok(back) => {
                if tx.send(Frame::back(RpcId::Fetch, &back)).await.is_err() {
                    final_status = Status::ErrFromTransport;
                    break;
                }
            }
            Err(status) => {
                final_status = status;
                break;
            }
        }
    }
    FetchResponse {
        status: final_status.into(),
    }
}

async fn resolve_fetch_batch(
    database: &dyn Database,
    mode: Mode,
    op_ref: u64,
    start_index: usize,
    chunk: &[Key],
) -> Result<FetchBack, Status> {
    let values = database.get(mode, chunk).await?;
    let mut keys_out = Vec::with_capacity(chunk.len());
    let mut values_out = Vec::with_capacity(chunk.len());
    let mut statuses = Vec::with_capacity(chunk.len());
    for (key, value) in chunk.iter().zip(values) {
        let entry_status = if value.is_some() {
            Status::Ok
        } else {
            Status::ErrKeyNotFound
        };
        keys_out.push(key.clone());
        values_out.push(value.unwrap_or_default());
        statuses.push(entry_status.into());
    }
    Ok(FetchBack {
        op_ref,
        start_index: start_index as u64,
        keys: keys_out,
        values: values_out,
        statuses,
    })
}

pub async fn iter(provider: &Provider, req: IterRequest, tx: &Sender<Frame>) -> IterResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return IterResponse {
            status: status.into(),
        };
    }
    let filter = match stowage_filter::build_key_value_filter(mode, &req.filter_param) {
        Ok(filter) => filter,
        Err(status) => {
            return IterResponse {
                status: status.into(),
            }
        }
    };

    let batch_size = req.batch_size.max(1);
    let op_ref = req.op_ref;
    let overall_max = req.max;
    let database = provider.database.clone();
    let mut from_key = req.from_key;
    let mut inclusive = mode.contains(Mode::INCLUSIVE);

    let backs = coroutines::try_coroutine(|mut co| async move {
        let mut start_index = 0u64;
        loop {
            let remaining = if overall_max == 0 {
                batch_size
            } else {
                let left = overall_max.saturating_sub(start_index);
                if left == 0 {
                    break;
                }
                left.min(batch_size)
            };
            let page_mode = if inclusive {
                mode | Mode::INCLUSIVE
            } else {
                mode - Mode::INCLUSIVE
            };
            let entries = database
                .list_key_values(page_mode, &from_key, remaining, filter.as_ref())
                .await?;
            if entries.is_empty() {
                break;
            }
            let got = entries.len() as u64;
            from_key = entries.last().unwrap().key.clone();
            inclusive = false;

            let mut keys_out = Vec::with_capacity(entries.len());
            let mut values_out = Vec::with_capacity(entries.len());
            for entry in entries {
                keys_out.push(entry.key);
                values_out.push(entry.value.unwrap_or_default());
            }
            co.yield_(IterBack {
                op_ref,
                start_index,
                keys: keys_out,
                values: values_out,
            })
            .await;

            start_index += got;
            if got < remaining {
                break;
            }
        }
        Ok(())
    });
    let mut backs = pin!(backs);

    let mut final_status = Status::Ok;
    while let Some(result) = backs.next().await {
        match result {
            Ok(back) => {
                if tx.send(Frame::back(RpcId::Iter, &back)).await.is_err() {
                    final_status = Status::ErrFromTransport;
                    break;
                }
            }
            Err(status) => {
                final_status = status;
                break;
            }
        }
    }
    IterResponse {
        status: final_status.into(),
    }
}

pub async fn doc_fetch(
    provider: &Provider,
    req: DocFetchRequest,
    tx: &Sender<Frame>,
) -> DocFetchResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocFetchResponse {
            status: status.into(),
        };
    }

    let batch_size = req.batch_size.max(1) as usize;
    let op_ref = req.op_ref;
    let database = provider.database.clone();
    let collection = req.collection;
    let ids = req.ids;

    let backs = coroutines::try_coroutine(|mut co| async move {
        for (index, chunk) in ids.chunks(batch_size).enumerate() {
            let docs = database.doc_load(mode, &collection, chunk).await?;
            let mut ids_out = Vec::with_capacity(chunk.len());
            let mut documents_out = Vec::with_capacity(chunk.len());
            let mut statuses = Vec::with_capacity(chunk.len());
            for (id, document) in chunk.iter().zip(docs) {
                let entry_status = if document.is_some() {
                    Status::Ok
                } else {
                    Status::ErrKeyNotFound
                };
                ids_out.push(*id);
                documents_out.push(document.unwrap_or_default());
                statuses.push(entry_status.into());
            }
            co.yield_(DocFetchBack {
                op_ref,
                start_index: (index * batch_size) as u64,
                ids: ids_out,
                documents: documents_out,
                statuses,
            })
            .await;
        }
        Ok(())
    });
    let mut backs = pin!(backs);

    let mut final_status = Status::Ok;
    while let Some(result) = backs.next().await {
        match result {
            Ok(back) => {
                if tx.send(Frame::back(RpcId::DocFetch, &back)).await.is_err() {
                    final_status = Status::ErrFromTransport;
                    break;
                }
            }
            Err(status) => {
                final_status = status;
                break;
            }
        }
    }
    DocFetchResponse {
        status: final_status.into(),
    }
}

pub async fn doc_iter(
    provider: &Provider,
    req: DocIterRequest,
    tx: &Sender<Frame>,
) -> DocIterResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocIterResponse {
            status: status.into(),
        };
    }
    let filter = match stowage_filter::build_document_filter(mode, &req.filter_param) {
        Ok(filter) => filter,
        Err(status) => {
            return DocIterResponse {
                status: status.into(),
            }
        }
    };

    let batch_size = req.batch_size.max(1);
    let op_ref = req.op_ref;
    let overall_max = req.max;
    let database = provider.database.clone();
    let collection = req.collection;
    let mut from_id = req.from_id;
    let mut inclusive = mode.contains(Mode::INCLUSIVE);

    let backs = coroutines::try_coroutine(|mut co| async move {
        let mut start_index = 0u64;
        loop {
            let remaining = if overall_max == 0 {
                batch_size
            } else {
                let left = overall_max.saturating_sub(start_index);
                if left == 0 {
                    break;
                }
                left.min(batch_size)
            };
            let page_mode = if inclusive {
                mode | Mode::INCLUSIVE
            } else {
                mode - Mode::INCLUSIVE
            };
            let entries = database
                .doc_list(page_mode, &collection, from_id, remaining, filter.as_ref())
                .await?;
            if entries.is_empty() {
                break;
            }
            let got = entries.len() as u64;
            from_id = entries.last().unwrap().id;
            inclusive = false;

            let mut ids_out = Vec::with_capacity(entries.len());
            let mut documents_out = Vec::with_capacity(entries.len());
            for entry in entries {
                ids_out.push(entry.id);
                documents_out.push(entry.document.unwrap_or_default());
            }
            co.yield_(DocIterBack {
                op_ref,
                start_index,
                ids: ids_out,
                documents: documents_out,
            })
            .await;

            start_index += got;
            if got < remaining {
                break;
            }
        }
        Ok(())
    });
    let mut backs = pin!(backs);

    let mut final_status = Status::Ok;
    while let Some(result) = backs.next().await {
        match result {
            Ok(back) => {
                if tx.send(Frame::back(RpcId::DocIter, &back)).await.is_err() {
                    final_status = Status::ErrFromTransport;
                    break;
                }
            }
            Err(status) => {
                final_status = status;
                break;
            }
        }
    }
    DocIterResponse {
        status: final_status.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_backend::HashMapDatabase;
    use stowage_buffer::DefaultCache;

    fn test_provider() -> Provider {
        Provider {
            id: 1,
            database: Arc::new(HashMapDatabase::new()),
            buffer_cache: Arc::new(DefaultCache),
        }
    }

    #[tokio::test]
    async fn fetch_streams_one_batch_per_chunk() {
        let provider = test_provider();
        provider
            .database
            .put(
                Mode::empty(),
                &[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())],
            )
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let req = FetchRequest {
            provider_id: 1,
            mode: 0,
            keys: vec![b"a".to_vec(), b"b".to_vec(), b"missing".to_vec()],
            op_ref: 7,
            batch_size: 2,
        };
        let response = fetch(&provider, req, &tx).await;
        assert_eq!(response.status, Status::Ok.into());
        drop(tx);

        let mut batches = Vec::new();
        while let Some(frame) = rx.recv().await {
            batches.push(frame.record::<FetchBack>().unwrap());
        }
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].start_index, 0);
        assert_eq!(batches[1].start_index, 2);
        assert_eq!(batches[1].statuses, vec![Status::ErrKeyNotFound.into()]);
    }

    #[tokio::test]
    async fn iter_paginates_to_the_end() {
        let provider = test_provider();
        provider
            .database
            .put(
                Mode::empty(),
                &[
                    (b"a".to_vec(), b"1".to_vec()),
                    (b"b".to_vec(), b"2".to_vec()),
                    (b"c".to_vec(), b"3".to_vec()),
                ],
            )
            .await
            .unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let req = IterRequest {
            provider_id: 1,
            mode: 0,
            from_key: Vec::new(),
            filter_param: Vec::new(),
            max: 0,
            op_ref: 1,
            batch_size: 2,
        };
        let response = iter(&provider, req, &tx).await;
        assert_eq!(response.status, Status::Ok.into());
        drop(tx);

        let mut total = 0;
        while let Some(frame) = rx.recv().await {
            total += frame.record::<IterBack>().unwrap().keys.len();
        }
        assert_eq!(total, 3);
    }
}
