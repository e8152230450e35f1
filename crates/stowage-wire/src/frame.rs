use crate::codec::{DecodeError, WireDecode, WireEncode};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Identifies which RPC a frame's body belongs to, so the receiving side
/// knows which record type to decode. `*_direct` twins are distinct ids
/// since they are distinct handlers bound in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RpcId {
    Count = 1,
    Put = 2,
    PutDirect = 3,
    Get = 4,
    GetDirect = 5,
    Length = 6,
    LengthDirect = 7,
    Exists = 8,
    ExistsDirect = 9,
    Erase = 10,
    EraseDirect = 11,
    ListKeys = 12,
    ListKeysDirect = 13,
    ListKeyValues = 14,
    ListKeyValuesDirect = 15,
    CollCreate = 16,
    CollDrop = 17,
    CollExists = 18,
    CollSize = 19,
    CollLastId = 20,
    DocStore = 21,
    DocStoreDirect = 22,
    DocUpdate = 23,
    DocUpdateDirect = 24,
    DocLoad = 25,
    DocLoadDirect = 26,
    DocLength = 27,
    DocList = 28,
    DocListDirect = 29,
    DocErase = 30,
    Fetch = 31,
    Iter = 32,
    DocFetch = 33,
    DocIter = 34,
    GetRemiProviderId = 35,
}

impl RpcId {
    /// The name this id is registered under (used for logging and as part
    /// of the `(provider_id, rpc_name)` registry key).
    pub fn name(self) -> &'static str {
        use RpcId::*;
        match self {
            Count => "count",
            Put => "put",
            PutDirect => "put_direct",
            Get => "get",
            GetDirect => "get_direct",
            Length => "length",
            LengthDirect => "length_direct",
            Exists => "exists",
            ExistsDirect => "exists_direct",
            Erase => "erase",
            EraseDirect => "erase_direct",
            ListKeys => "list_keys",
            ListKeysDirect => "list_keys_direct",
            ListKeyValues => "list_keyvals",
            ListKeyValuesDirect => "list_keyvals_direct",
            CollCreate => "coll_create",
            CollDrop => "coll_drop",
            CollExists => "coll_exists",
            CollSize => "coll_size",
            CollLastId => "coll_last_id",
            DocStore => "doc_store",
            DocStoreDirect => "doc_store_direct",
            DocUpdate => "doc_update",
            DocUpdateDirect => "doc_update_direct",
            DocLoad => "doc_load",
            DocLoadDirect => "doc_load_direct",
            DocLength => "doc_length",
            DocList => "doc_list",
            DocListDirect => "doc_list_direct",
            DocErase => "doc_erase",
            Fetch => "fetch",
            Iter => "iter",
            DocFetch => "doc_fetch",
            DocIter => "doc_iter",
            GetRemiProviderId => "get_remi_provider_id",
        }
    }

    fn from_u16(raw: u16) -> Result<Self, DecodeError> {
        use RpcId::*;
        Ok(match raw {
            1 => Count,
            2 => Put,
            3 => PutDirect,
            4 => Get,
            5 => GetDirect,
            6 => Length,
            7 => LengthDirect,
            8 => Exists,
            9 => ExistsDirect,
            10 => Erase,
            11 => EraseDirect,
            12 => ListKeys,
            13 => ListKeysDirect,
            14 => ListKeyValues,
            15 => ListKeyValuesDirect,
            16 => CollCreate,
            17 => CollDrop,
            18 => CollExists,
            19 => CollSize,
            20 => CollLastId,
            21 => DocStore,
            22 => DocStoreDirect,
            23 => DocUpdate,
            24 => DocUpdateDirect,
            25 => DocLoad,
            26 => DocLoadDirect,
            27 => DocLength,
            28 => DocList,
            29 => DocListDirect,
            30 => DocErase,
            31 => Fetch,
            32 => Iter,
            33 => DocFetch,
            34 => DocIter,
            35 => GetRemiProviderId,
            _ => return Err(DecodeError::UnexpectedEof),
        })
    }
}

/// Distinguishes a streaming op's batch deliveries ("back-RPCs") from its
/// terminal response, and both from a client-issued request. Non-streaming
/// ops always use `Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameRole {
    Request = 0,
    Back = 1,
    Final = 2,
}

impl FrameRole {
    fn from_u8(raw: u8) -> Result<Self, DecodeError> {
        match raw {
            0 => Ok(FrameRole::Request),
            1 => Ok(FrameRole::Back),
            2 => Ok(FrameRole::Final),
            _ => Err(DecodeError::UnexpectedEof),
        }
    }
}

/// One length-delimited transport frame: an RPC id and role tag, followed by
/// the raw encoded record body. The outer 4-byte length prefix is applied by
/// `tokio_util::codec::LengthDelimitedCodec`; `Frame` governs only the
/// payload carried inside that prefix.
#[derive(Debug, Clone)]
pub struct Frame {
    pub rpc: RpcId,
    pub role: FrameRole,
    pub body: Bytes,
}

impl Frame {
    pub fn request(rpc: RpcId, record: &impl WireEncode) -> Frame {
        Frame::new(rpc, FrameRole::Request, record)
    }

    pub fn final_response(rpc: RpcId, record: &impl WireEncode) -> Frame {
        Frame::new(rpc, FrameRole::Final, record)
    }

    pub fn back(rpc: RpcId, record: &impl WireEncode) -> Frame {
        Frame::new(rpc, FrameRole::Back, record)
    }

    fn new(rpc: RpcId, role: FrameRole, record: &impl WireEncode) -> Frame {
        let mut buf = BytesMut::new();
        record.encode(&mut buf);
        Frame {
            rpc,
            role,
            body: buf.freeze(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3 + self.body.len());
        buf.put_u16_le(self.rpc as u16);
        buf.put_u8(self.role as u8);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    pub fn decode(mut raw: Bytes) -> Result<Frame, DecodeError> {
        if raw.len() < 3 {
            return Err(DecodeError::UnexpectedEof);
        }
        let rpc = RpcId::from_u16(raw.get_u16_le())?;
        let role = FrameRole::from_u8(raw.get_u8())?;
        Ok(Frame {
            rpc,
            role,
            body: raw,
        })
    }

    pub fn record<T: WireDecode>(&self) -> Result<T, DecodeError> {
        let mut body = self.body.clone();
        let record = T::decode(&mut body)?;
        if !body.is_empty() {
            return Err(DecodeError::TrailingBytes(body.len()));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CountRequest;

    #[test]
    fn round_trips_a_frame() {
        let req = CountRequest { provider_id: 7 };
        let frame = Frame::request(RpcId::Count, &req);
        let raw = frame.encode();

        let decoded = Frame::decode(raw.clone().into()).unwrap();
        assert_eq!(decoded.rpc, RpcId::Count);
        assert_eq!(decoded.role, FrameRole::Request);
        assert_eq!(decoded.record::<CountRequest>().unwrap(), req);
    }

    #[test]
    fn rpc_name_is_stable() {
        assert_eq!(RpcId::Fetch.name(), "fetch");
        assert_eq!(RpcId::ListKeyValuesDirect.name(), "list_keyvals_direct");
    }
}
