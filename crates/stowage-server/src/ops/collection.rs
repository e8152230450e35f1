use stowage_types::Status;
use stowage_wire::records::{
    CollCreateRequest, CollCreateResponse, CollDropRequest, CollDropResponse, CollExistsRequest,
    CollExistsResponse, CollLastIdRequest, CollLastIdResponse, CollSizeRequest, CollSizeResponse,
};

use crate::provider::Provider;

pub async fn coll_create(provider: &Provider, req: CollCreateRequest) -> CollCreateResponse {
    match provider.database.coll_create(&req.name).await {
        Ok(()) => CollCreateResponse {
            status: Status::Ok.into(),
        },
        Err(status) => CollCreateResponse {
            status: status.into(),
        },
    }
}

pub async fn coll_drop(provider: &Provider, req: CollDropRequest) -> CollDropResponse {
    match provider.database.coll_drop(&req.name).await {
        Ok(()) => CollDropResponse {
            status: Status::Ok.into(),
        },
        Err(status) => CollDropResponse {
            status: status.into(),
        },
    }
}

pub async fn coll_exists(provider: &Provider, req: CollExistsRequest) -> CollExistsResponse {
    match provider.database.coll_exists(&req.name).await {
        Ok(exists) => CollExistsResponse {
            status: Status::Ok.into(),
            exists,
        },
        Err(status) => CollExistsResponse {
            status: status.into(),
            exists: false,
        },
    }
}

pub async fn coll_last_id(provider: &Provider, req: CollLastIdRequest) -> CollLastIdResponse {
    match provider.database.coll_last_id(&req.name).await {
        Ok(last_id) => CollLastIdResponse {
            status: Status::Ok.into(),
            last_id,
        },
        Err(status) => CollLastIdResponse {
            status: status.into(),
            last_id: 0,
        },
    }
}

pub async fn coll_size(provider: &Provider, req: CollSizeRequest) -> CollSizeResponse {
    match provider.database.coll_size(&req.name).await {
        Ok(size) => CollSizeResponse {
            status: Status::Ok.into(),
            size,
        },
        Err(status) => CollSizeResponse {
            status: status.into(),
            size: 0,
        },
    }
}
