pub mod collection;
pub mod data;
pub mod document;
pub mod streaming;

use stowage_types::Status;
use stowage_wire::records::{GetRemiProviderIdRequest, GetRemiProviderIdResponse};

/// Remi is the companion bulk-transfer service in the system this one was
/// split off from; there is nothing on this side for a provider id to name.
pub async fn get_remi_provider_id(req: GetRemiProviderIdRequest) -> GetRemiProviderIdResponse {
    let _ = req;
    GetRemiProviderIdResponse {
        status: Status::ErrOpUnsupported.into(),
        remi_provider_id: 0,
    }
}
