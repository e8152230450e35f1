use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Errors raised while decoding a wire record from a byte buffer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of frame while decoding a wire record")]
    UnexpectedEof,
    #[error("string field was not valid UTF-8")]
    InvalidUtf8,
    #[error("length-prefixed field declared a length too large to hold in memory")]
    LengthOverflow,
    #[error("trailing {0} bytes remained after decoding a complete record")]
    TrailingBytes(usize),
}

/// Serializes `Self` onto the wire. Integers are little-endian fixed-width;
/// strings and opaque payloads are `u64`-length-prefixed with no terminator.
pub trait WireEncode {
    fn encode(&self, buf: &mut BytesMut);
}

/// Deserializes `Self` from the front of `buf`, advancing it past the
/// consumed bytes.
pub trait WireDecode: Sized {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError>;
}

macro_rules! impl_wire_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl WireEncode for $t {
                fn encode(&self, buf: &mut BytesMut) {
                    buf.put_slice(&self.to_le_bytes());
                }
            }
            impl WireDecode for $t {
                fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
                    const N: usize = std::mem::size_of::<$t>();
                    if buf.len() < N {
                        return Err(DecodeError::UnexpectedEof);
                    }
                    let mut raw = [0u8; N];
                    raw.copy_from_slice(&buf[..N]);
                    buf.advance(N);
                    Ok(<$t>::from_le_bytes(raw))
                }
            }
        )*
    };
}

impl_wire_int!(u8, u16, u32, u64, i32, i64);

impl WireEncode for bool {
    fn encode(&self, buf: &mut BytesMut) {
        (*self as u8).encode(buf);
    }
}

impl WireDecode for bool {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(u8::decode(buf)? != 0)
    }
}

impl WireEncode for uuid::Uuid {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }
}

impl WireDecode for uuid::Uuid {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        if buf.len() < 16 {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&buf[..16]);
        buf.advance(16);
        Ok(uuid::Uuid::from_bytes(raw))
    }
}

/// Opaque length-prefixed byte payload (keys, values, documents, filter params).
impl WireEncode for Bytes {
    fn encode(&self, buf: &mut BytesMut) {
        (self.len() as u64).encode(buf);
        buf.put_slice(self);
    }
}

impl WireDecode for Bytes {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u64::decode(buf)? as usize;
        if buf.len() < len {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(buf.split_to(len))
    }
}

impl WireEncode for String {
    fn encode(&self, buf: &mut BytesMut) {
        (self.len() as u64).encode(buf);
        buf.put_slice(self.as_bytes());
    }
}

impl WireDecode for String {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u64::decode(buf)? as usize;
        if buf.len() < len {
            return Err(DecodeError::UnexpectedEof);
        }
        let raw = buf.split_to(len);
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}

/// A homogeneous sequence is `u64`-count-prefixed, elements packed back to
/// back. For `Vec<u8>` this degenerates to one length prefix followed by the
/// raw bytes, byte-at-a-time, which is the same shape [`Bytes`] produces.
impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        (self.len() as u64).encode(buf);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let count = u64::decode(buf)? as usize;
        let mut out = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            out.push(T::decode(buf)?);
        }
        Ok(out)
    }
}

/// Defines a wire record struct together with its `WireEncode`/`WireDecode`
/// impls, field-by-field in declaration order. Every RPC's in/out record in
/// `crate::records` is declared this way, keeping the (de)serialization of
/// each in lock-step with its field list.
macro_rules! wire_record {
    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl $crate::codec::WireEncode for $name {
            fn encode(&self, buf: &mut bytes::BytesMut) {
                $( $crate::codec::WireEncode::encode(&self.$field, buf); )*
            }
        }

        impl $crate::codec::WireDecode for $name {
            fn decode(buf: &mut bytes::Bytes) -> Result<Self, $crate::codec::DecodeError> {
                Ok(Self {
                    $( $field: $crate::codec::WireDecode::decode(buf)?, )*
                })
            }
        }
    };
}

pub(crate) use wire_record;

#[cfg(test)]
mod tests {
    use super::*;

    wire_record!(
        Example {
            a: u32,
            name: String,
            sizes: Vec<u64>,
            payload: Vec<u8>,
        }
    );

    #[test]
    fn round_trips_a_record() {
        let value = Example {
            a: 7,
            name: "hello".to_string(),
            sizes: vec![1, 2, 3],
            payload: vec![9, 9, 9],
        };
        let mut buf = BytesMut::new();
        value.encode(&mut buf);

        let mut frozen = buf.freeze();
        let decoded = Example::decode(&mut frozen).unwrap();
        assert_eq!(decoded, value);
        assert!(frozen.is_empty());
    }

    #[test]
    fn truncated_buffer_is_an_eof_error() {
        let mut buf = BytesMut::new();
        42u64.encode(&mut buf);
        buf.truncate(4);
        let mut frozen = buf.freeze();
        assert_eq!(u64::decode(&mut frozen), Err(DecodeError::UnexpectedEof));
    }
}
