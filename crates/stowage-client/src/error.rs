use stowage_types::Status;
use stowage_wire::{DecodeError, TransportError};

/// Client-side error: either the call never reached the server (and so
/// carries no `Status`), or it did and the server's status was non-`Ok`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response frame: {0}")]
    Decode(#[from] DecodeError),
    #[error("server returned error status: {0}")]
    Status(Status),
    #[error("user callback returned error status: {0}")]
    Callback(Status),
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Io(e) => Error::Io(e),
            TransportError::Decode(e) => Error::Decode(e),
            TransportError::Closed => {
                Error::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed"))
            }
        }
    }
}

impl Error {
    /// `true` for errors that mean the underlying connection should be
    /// dropped rather than reused for the next call.
    pub fn poisons_connection(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Decode(_))
    }
}
