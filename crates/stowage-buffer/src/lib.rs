//! Bulk I/O buffer cache: a small set of reuse policies sitting in front of
//! plain heap allocation, amortizing allocation cost across requests.

mod buffer;
mod config;
mod policy;

pub use buffer::Buffer;
pub use config::{build, BufferCacheConfig};
pub use policy::{BufferCache, DefaultCache, KeepAllCache, LruCache};
