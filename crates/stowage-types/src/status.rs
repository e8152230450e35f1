/// Error/status codes carried on the wire as a signed 32-bit field.
///
/// `Ok` is always `0`; every other variant is a distinct negative value so
/// that a caller can distinguish a status from a valid non-negative size
/// where the wire format permits both in the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(i32)]
pub enum Status {
    #[error("ok")]
    Ok = 0,
    #[error("invalid arguments")]
    ErrInvalidArgs = -1,
    #[error("invalid or incompatible mode")]
    ErrInvalidMode = -2,
    #[error("no such provider at the endpoint")]
    ErrInvalidProvider = -3,
    #[error("no such database")]
    ErrInvalidDatabase = -4,
    #[error("admin token mismatch")]
    ErrInvalidToken = -5,
    #[error("invalid configuration")]
    ErrInvalidConfig = -6,
    #[error("no backend registered for the requested type tag")]
    ErrInvalidBackend = -7,
    #[error("filter source or spec could not be constructed")]
    ErrInvalidFilter = -8,
    #[error("allocation failure")]
    ErrAllocation = -9,
    #[error("caller buffer too small")]
    ErrBufferSize = -10,
    #[error("key not found")]
    ErrKeyNotFound = -11,
    #[error("key already exists")]
    ErrKeyExists = -12,
    #[error("transport error")]
    ErrFromTransport = -13,
    #[error("migration error")]
    ErrFromMigration = -14,
    #[error("operation not supported by this backend")]
    ErrOpUnsupported = -15,
    #[error("other error")]
    ErrOther = -16,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(code: i32) -> Status {
        match code {
            0 => Status::Ok,
            -1 => Status::ErrInvalidArgs,
            -2 => Status::ErrInvalidMode,
            -3 => Status::ErrInvalidProvider,
            -4 => Status::ErrInvalidDatabase,
            -5 => Status::ErrInvalidToken,
            -6 => Status::ErrInvalidConfig,
            -7 => Status::ErrInvalidBackend,
            -8 => Status::ErrInvalidFilter,
            -9 => Status::ErrAllocation,
            -10 => Status::ErrBufferSize,
            -11 => Status::ErrKeyNotFound,
            -12 => Status::ErrKeyExists,
            -13 => Status::ErrFromTransport,
            -14 => Status::ErrFromMigration,
            -15 => Status::ErrOpUnsupported,
            _ => Status::ErrOther,
        }
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> i32 {
        status.as_i32()
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Status {
        Status::from_i32(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_i32() {
        for status in [
            Status::Ok,
            Status::ErrInvalidArgs,
            Status::ErrKeyNotFound,
            Status::ErrOther,
        ] {
            assert_eq!(Status::from_i32(status.as_i32()), status);
        }
    }

    #[test]
    fn unknown_code_maps_to_other() {
        assert_eq!(Status::from_i32(-999), Status::ErrOther);
    }
}
