//! Concrete in/out records for every RPC, declared with [`crate::codec::wire_record`].
//!
//! A one-shot op's direct and bulk variants share the same record shape —
//! the wire codec never modeled a true zero-copy bulk region to begin with,
//! so there is nothing left to differentiate at this layer; `RpcId` alone
//! tells the registry which variant was invoked.

use crate::codec::wire_record;

wire_record!(CountRequest {
    provider_id: u16,
});

wire_record!(CountResponse {
    status: i32,
    count: u64,
});

wire_record!(PutRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
});

wire_record!(PutResponse {
    status: i32,
});

wire_record!(GetRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
    /// Caller-supplied slot sizes; ignored when `mode` carries `PACKED`.
    value_sizes: Vec<u64>,
    /// Caller-supplied aggregate output buffer size; only consulted when
    /// `mode` carries `PACKED`, ignored otherwise.
    packed_buffer_size: u64,
});

wire_record!(GetResponse {
    status: i32,
    /// Per-key size, or a sentinel from `stowage_types::sentinel`.
    value_sizes: Vec<u64>,
    /// Concatenation, in key order, of every value actually returned.
    values: Vec<u8>,
});

wire_record!(LengthRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
});

wire_record!(LengthResponse {
    status: i32,
    value_sizes: Vec<u64>,
});

wire_record!(ExistsRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
});

wire_record!(ExistsResponse {
    status: i32,
    /// `ceil(keys.len() / 8)` bytes; bit `i` set iff key `i` is present.
    bitfield: Vec<u8>,
});

wire_record!(EraseRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
});

wire_record!(EraseResponse {
    status: i32,
});

wire_record!(ListKeysRequest {
    provider_id: u16,
    mode: u32,
    from_key: Vec<u8>,
    filter_param: Vec<u8>,
    max: u64,
});

wire_record!(ListKeysResponse {
    status: i32,
    keys: Vec<Vec<u8>>,
});

wire_record!(ListKeyValuesRequest {
    provider_id: u16,
    mode: u32,
    from_key: Vec<u8>,
    filter_param: Vec<u8>,
    max: u64,
});

wire_record!(ListKeyValuesResponse {
    status: i32,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
});

wire_record!(CollCreateRequest {
    provider_id: u16,
    name: String,
});
wire_record!(CollCreateResponse { status: i32 });

wire_record!(CollDropRequest {
    provider_id: u16,
    name: String,
});
wire_record!(CollDropResponse { status: i32 });

wire_record!(CollExistsRequest {
    provider_id: u16,
    name: String,
});
wire_record!(CollExistsResponse {
    status: i32,
    exists: bool,
});

wire_record!(CollLastIdRequest {
    provider_id: u16,
    name: String,
});
wire_record!(CollLastIdResponse {
    status: i32,
    last_id: u64,
});

wire_record!(CollSizeRequest {
    provider_id: u16,
    name: String,
});
wire_record!(CollSizeResponse {
    status: i32,
    size: u64,
});

wire_record!(DocStoreRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    documents: Vec<Vec<u8>>,
});

wire_record!(DocStoreResponse {
    status: i32,
    /// Assigned in the same order as `documents`, strictly increasing.
    ids: Vec<u64>,
});

wire_record!(DocUpdateRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    ids: Vec<u64>,
    documents: Vec<Vec<u8>>,
});

wire_record!(DocUpdateResponse {
    status: i32,
});

wire_record!(DocLoadRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    ids: Vec<u64>,
});

wire_record!(DocLoadResponse {
    status: i32,
    sizes: Vec<u64>,
    documents: Vec<u8>,
});

wire_record!(DocLengthRequest {
    provider_id: u16,
    collection: String,
    ids: Vec<u64>,
});

wire_record!(DocLengthResponse {
    status: i32,
    sizes: Vec<u64>,
});

wire_record!(DocListRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    from_id: u64,
    filter_param: Vec<u8>,
    max: u64,
});

wire_record!(DocListResponse {
    status: i32,
    ids: Vec<u64>,
    documents: Vec<Vec<u8>>,
});

wire_record!(DocEraseRequest {
    provider_id: u16,
    collection: String,
    ids: Vec<u64>,
});

wire_record!(DocEraseResponse {
    status: i32,
});

wire_record!(FetchRequest {
    provider_id: u16,
    mode: u32,
    keys: Vec<Vec<u8>>,
    /// Client-chosen correlation id, echoed verbatim on every back-RPC.
    op_ref: u64,
    batch_size: u64,
});

wire_record!(FetchBack {
    op_ref: u64,
    start_index: u64,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
    /// Per-entry backend callback status, in the same order as `keys`.
    statuses: Vec<i32>,
});

wire_record!(FetchResponse {
    status: i32,
});

wire_record!(IterRequest {
    provider_id: u16,
    mode: u32,
    from_key: Vec<u8>,
    filter_param: Vec<u8>,
    max: u64,
    op_ref: u64,
    batch_size: u64,
});

wire_record!(IterBack {
    op_ref: u64,
    start_index: u64,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
});

wire_record!(IterResponse {
    status: i32,
});

wire_record!(DocFetchRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    ids: Vec<u64>,
    op_ref: u64,
    batch_size: u64,
});

wire_record!(DocFetchBack {
    op_ref: u64,
    start_index: u64,
    ids: Vec<u64>,
    documents: Vec<Vec<u8>>,
    statuses: Vec<i32>,
});

wire_record!(DocFetchResponse {
    status: i32,
});

wire_record!(DocIterRequest {
    provider_id: u16,
    mode: u32,
    collection: String,
    from_id: u64,
    filter_param: Vec<u8>,
    max: u64,
    op_ref: u64,
    batch_size: u64,
});

wire_record!(DocIterBack {
    op_ref: u64,
    start_index: u64,
    ids: Vec<u64>,
    documents: Vec<Vec<u8>>,
});

wire_record!(DocIterResponse {
    status: i32,
});

wire_record!(GetRemiProviderIdRequest {
    provider_id: u16,
});

wire_record!(GetRemiProviderIdResponse {
    status: i32,
    remi_provider_id: u16,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{WireDecode, WireEncode};
    use bytes::BytesMut;

    #[test]
    fn put_request_round_trips() {
        let req = PutRequest {
            provider_id: 1,
            mode: 0,
            keys: vec![b"a".to_vec(), b"bb".to_vec()],
            values: vec![b"x".to_vec(), b"yy".to_vec()],
        };
        let mut buf = BytesMut::new();
        req.encode(&mut buf);
        let mut frozen = buf.freeze();
        assert_eq!(PutRequest::decode(&mut frozen).unwrap(), req);
        assert!(frozen.is_empty());
    }

    #[test]
    fn fetch_back_round_trips_with_per_entry_status() {
        let back = FetchBack {
            op_ref: 42,
            start_index: 0,
            keys: vec![b"a".to_vec()],
            values: vec![b"1".to_vec()],
            statuses: vec![0],
        };
        let mut buf = BytesMut::new();
        back.encode(&mut buf);
        let mut frozen = buf.freeze();
        assert_eq!(FetchBack::decode(&mut frozen).unwrap(), back);
    }
}
