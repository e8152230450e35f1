use stowage_types::{Mode, Status};
use stowage_wire::records::{
    DocEraseRequest, DocEraseResponse, DocLengthRequest, DocLengthResponse, DocListRequest,
    DocListResponse, DocLoadRequest, DocLoadResponse, DocStoreRequest, DocStoreResponse,
    DocUpdateRequest, DocUpdateResponse,
};

use crate::provider::{validate_mode, Provider};

pub async fn doc_store(provider: &Provider, req: DocStoreRequest) -> DocStoreResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocStoreResponse {
            status: status.into(),
            ids: Vec::new(),
        };
    }
    match provider
        .database
        .doc_store(mode, &req.collection, &req.documents)
        .await
    {
        Ok(ids) => DocStoreResponse {
            status: Status::Ok.into(),
            ids,
        },
        Err(status) => DocStoreResponse {
            status: status.into(),
            ids: Vec::new(),
        },
    }
}

pub async fn doc_update(provider: &Provider, req: DocUpdateRequest) -> DocUpdateResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocUpdateResponse {
            status: status.into(),
        };
    }
    let updates: Vec<_> = req.ids.into_iter().zip(req.documents).collect();
    match provider
        .database
        .doc_update(mode, &req.collection, &updates)
        .await
    {
        Ok(()) => DocUpdateResponse {
            status: Status::Ok.into(),
        },
        Err(status) => DocUpdateResponse {
            status: status.into(),
        },
    }
}

pub async fn doc_load(provider: &Provider, req: DocLoadRequest) -> DocLoadResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocLoadResponse {
            status: status.into(),
            sizes: Vec::new(),
            documents: Vec::new(),
        };
    }
    match provider
        .database
        .doc_load(mode, &req.collection, &req.ids)
        .await
    {
        Ok(docs) => {
            let mut sizes = Vec::with_capacity(docs.len());
            let mut payload = Vec::new();
            for doc in &docs {
                match doc {
                    Some(bytes) => {
                        sizes.push(bytes.len() as u64);
                        payload.extend_from_slice(bytes);
                    }
                    None => sizes.push(stowage_types::sentinel::KEY_NOT_FOUND),
                }
            }
            DocLoadResponse {
                status: Status::Ok.into(),
                sizes,
                documents: payload,
            }
        }
        Err(status) => DocLoadResponse {
            status: status.into(),
            sizes: Vec::new(),
            documents: Vec::new(),
        },
    }
}

pub async fn doc_length(provider: &Provider, req: DocLengthRequest) -> DocLengthResponse {
    match provider
        .database
        .doc_length(Mode::empty(), &req.collection, &req.ids)
        .await
    {
        Ok(sizes) => DocLengthResponse {
            status: Status::Ok.into(),
            sizes: sizes
                .into_iter()
                .map(|size| size.unwrap_or(stowage_types::sentinel::KEY_NOT_FOUND))
                .collect(),
        },
        Err(status) => DocLengthResponse {
            status: status.into(),
            sizes: Vec::new(),
        },
    }
}

pub async fn doc_list(provider: &Provider, req: DocListRequest) -> DocListResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return DocListResponse {
            status: status.into(),
            ids: Vec::new(),
            documents: Vec::new(),
        };
    }
    let filter = match stowage_filter::build_document_filter(mode, &req.filter_param) {
        Ok(filter) => filter,
        Err(status) => {
            return DocListResponse {
                status: status.into(),
                ids: Vec::new(),
                documents: Vec::new(),
            }
        }
    };
    match provider
        .database
        .doc_list(mode, &req.collection, req.from_id, req.max, filter.as_ref())
        .await
    {
        Ok(entries) => {
            let mut ids = Vec::with_capacity(entries.len());
            let mut documents = Vec::with_capacity(entries.len());
            for entry in entries {
                ids.push(entry.id);
                documents.push(entry.document.unwrap_or_default());
            }
            DocListResponse {
                status: Status::Ok.into(),
                ids,
                documents,
            }
        }
        Err(status) => DocListResponse {
            status: status.into(),
            ids: Vec::new(),
            documents: Vec::new(),
        },
    }
}

pub async fn doc_erase(provider: &Provider, req: DocEraseRequest) -> DocEraseResponse {
    match provider.database.doc_erase(&req.collection, &req.ids).await {
        Ok(()) => DocEraseResponse {
            status: Status::Ok.into(),
        },
        Err(status) => DocEraseResponse {
            status: status.into(),
        },
    }
}
