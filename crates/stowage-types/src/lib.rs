//! Core domain types shared across the wire codec, storage backend, server
//! and client crates: the mode bitflags, wire status codes, size sentinels
//! and the small set of value types (`Key`, `Value`, `DocumentId`) that flow
//! through every layer.

mod mode;
mod sentinel;
mod status;

pub use mode::Mode;
pub use sentinel::{is_sentinel, BUF_TOO_SMALL, KEY_NOT_FOUND, LAST_VALID_SIZE, NO_MORE_KEYS};
pub use status::Status;

/// A non-empty byte string identifying a stored value or document.
pub type Key = Vec<u8>;

/// A possibly-empty byte string stored under a `Key` or `DocumentId`.
pub type Value = Vec<u8>;

/// Server-assigned identifier of a document within a collection.
pub type DocumentId = u64;

/// Access rights requested of a buffer acquired from the buffer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Returns `Err(Status::ErrInvalidArgs)` if any key in `keys` has zero length.
///
/// Every data-plane RPC performs this check before invoking the backend;
/// centralizing it keeps the per-op handlers in `stowage-server` uniform.
pub fn validate_keys<'a>(keys: impl IntoIterator<Item = &'a [u8]>) -> Result<(), Status> {
    for key in keys {
        if key.is_empty() {
            return Err(Status::ErrInvalidArgs);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        let keys: Vec<&[u8]> = vec![b"a", b"", b"b"];
        assert_eq!(validate_keys(keys), Err(Status::ErrInvalidArgs));
    }

    #[test]
    fn accepts_all_non_empty() {
        let keys: Vec<&[u8]> = vec![b"a", b"bb"];
        assert_eq!(validate_keys(keys), Ok(()));
    }
}
