use stowage_types::Access;

/// A reusable, appropriately-sized I/O buffer handed out by a [`crate::BufferCache`].
///
/// The upstream RDMA design pairs a buffer with a registered bulk-transfer
/// descriptor; collapsed onto a single framed TCP stream, a buffer's only
/// remaining job is holding bytes, so it is just an owned allocation plus
/// the access rights it was acquired under.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    access: Access,
}

impl Buffer {
    pub(crate) fn new(data: Vec<u8>, access: Access) -> Self {
        Buffer { data, access }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reclaims the backing allocation, discarding access rights. Used by
    /// cache policies that want to pool the raw storage rather than the
    /// `Buffer` wrapper itself.
    pub(crate) fn into_storage(self) -> Vec<u8> {
        self.data
    }
}
