//! Binary wire codec, RPC frame shapes, and the handler registry they bind to.

mod codec;
mod frame;
pub mod records;
mod registry;
mod transport;

pub use codec::{DecodeError, WireDecode, WireEncode};
pub use frame::{Frame, FrameRole, RpcId};
pub use registry::Registry;
pub use transport::{decode_segment, framed, length_delimited_codec, TransportError};
