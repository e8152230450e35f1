use parking_lot::Mutex;
use stowage_types::Access;

use crate::buffer::Buffer;

/// Provider-scoped allocator of reusable I/O buffers.
///
/// `get`/`release` must be safely callable from many concurrent handlers;
/// implementations guard their internal free lists with a lock rather than
/// requiring `&mut self`. `finalize` is called exactly once, after every
/// in-flight request has drained, to drop pooled storage.
pub trait BufferCache: Send + Sync {
    fn get(&self, size: usize, access: Access) -> Buffer;
    fn release(&self, buffer: Buffer);
    fn finalize(&self) {}
}

/// Allocates fresh storage on every `get`, frees it on `release`. No sharing.
#[derive(Debug, Default)]
pub struct DefaultCache;

impl BufferCache for DefaultCache {
    fn get(&self, size: usize, access: Access) -> Buffer {
        Buffer::new(vec![0u8; size], access)
    }

    fn release(&self, _buffer: Buffer) {}
}

/// Per-access free list of released buffers, kept sorted by capacity; `get`
/// takes the smallest entry at least as large as requested, growing the
/// pool on a miss. Entries are never shrunk or discarded.
#[derive(Default)]
pub struct KeepAllCache {
    read: Mutex<Vec<Vec<u8>>>,
    write: Mutex<Vec<Vec<u8>>>,
    read_write: Mutex<Vec<Vec<u8>>>,
}

impl KeepAllCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool_for(&self, access: Access) -> &Mutex<Vec<Vec<u8>>> {
        match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
            Access::ReadWrite => &self.read_write,
        }
    }
}

impl BufferCache for KeepAllCache {
    fn get(&self, size: usize, access: Access) -> Buffer {
        let mut pool = self.pool_for(access).lock();
        let slot = pool
            .iter()
            .position(|candidate| candidate.len() >= size)
            .map(|index| pool.remove(index));
        let mut storage = slot.unwrap_or_default();
        storage.resize(storage.len().max(size), 0);
        Buffer::new(storage, access)
    }

    fn release(&self, buffer: Buffer) {
        let access = buffer.access();
        let mut pool = self.pool_for(access).lock();
        let storage = buffer.into_storage();
        let insert_at = pool
            .iter()
            .position(|candidate| candidate.len() >= storage.len())
            .unwrap_or(pool.len());
        pool.insert(insert_at, storage);
    }

    fn finalize(&self) {
        self.read.lock().clear();
        self.write.lock().clear();
        self.read_write.lock().clear();
    }
}

struct LruState {
    pool: Vec<Vec<u8>>,
    pooled_bytes: usize,
}

/// Like [`KeepAllCache`] but with a total-bytes ceiling: releasing a buffer
/// that would push the pool over the ceiling evicts least-recently-released
/// entries (the front of `pool`) until it fits.
pub struct LruCache {
    ceiling_bytes: usize,
    state: Mutex<LruState>,
}

impl LruCache {
    pub fn new(ceiling_bytes: usize) -> Self {
        LruCache {
            ceiling_bytes,
            state: Mutex::new(LruState {
                pool: Vec::new(),
                pooled_bytes: 0,
            }),
        }
    }
}

impl BufferCache for LruCache {
    fn get(&self, size: usize, access: Access) -> Buffer {
        let mut state = self.state.lock();
        let slot = state
            .pool
            .iter()
            .position(|candidate| candidate.len() >= size)
            .map(|index| state.pool.remove(index));
        if let Some(storage) = &slot {
            state.pooled_bytes -= storage.len();
        }
        let mut storage = slot.unwrap_or_default();
        storage.resize(storage.len().max(size), 0);
        Buffer::new(storage, access)
    }

    fn release(&self, buffer: Buffer) {
        let storage = buffer.into_storage();
        let mut state = self.state.lock();
        state.pooled_bytes += storage.len();
        state.pool.push(storage);
        while state.pooled_bytes > self.ceiling_bytes {
            if state.pool.is_empty() {
                break;
            }
            let evicted = state.pool.remove(0);
            state.pooled_bytes -= evicted.len();
        }
    }

    fn finalize(&self) {
        let mut state = self.state.lock();
        state.pool.clear();
        state.pooled_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_never_reuses() {
        let cache = DefaultCache;
        let buf = cache.get(16, Access::Read);
        assert_eq!(buf.len(), 16);
        cache.release(buf);
    }

    #[test]
    fn keep_all_reuses_smallest_fit() {
        let cache = KeepAllCache::new();
        let a = cache.get(8, Access::Write);
        cache.release(a);
        let b = cache.get(16, Access::Write);
        cache.release(b);

        let reused = cache.get(10, Access::Write);
        assert_eq!(reused.len(), 16);
    }

    #[test]
    fn lru_cache_evicts_past_ceiling() {
        let cache = LruCache::new(20);
        let a = cache.get(16, Access::Read);
        cache.release(a);
        let b = cache.get(16, Access::Read);
        cache.release(b);

        let state = cache.state.lock();
        assert!(state.pooled_bytes <= 20);
    }
}
