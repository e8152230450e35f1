use stowage_types::Status;
use stowage_wire::{DecodeError, TransportError};

/// Internal server error type, distinguishing I/O and codec failures from
/// backend statuses before they are collapsed onto the wire's `Status` at
/// the RPC boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request frame: {0}")]
    Decode(#[from] DecodeError),
    #[error("backend error: {0}")]
    Backend(Status),
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Backend(status)
    }
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

impl From<&Error> for Status {
    fn from(error: &Error) -> Status {
        match error {
            Error::Io(_) => Status::ErrFromTransport,
            Error::Decode(_) => Status::ErrInvalidArgs,
            Error::Backend(status) => *status,
        }
    }
}
