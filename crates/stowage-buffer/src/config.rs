use std::sync::Arc;

use serde::Deserialize;
use stowage_types::Status;

use crate::policy::{BufferCache, DefaultCache, KeepAllCache, LruCache};

/// The `buffer_cache` section of a provider's JSON configuration.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BufferCacheConfig {
    Default,
    KeepAll,
    Lru {
        #[serde(default = "default_lru_ceiling_bytes")]
        capacity_bytes: usize,
    },
    /// The provider embedder supplies an implementation at construction
    /// time; this crate has nothing to build.
    External,
}

fn default_lru_ceiling_bytes() -> usize {
    64 * 1024 * 1024
}

/// Builds the built-in cache named by `config`. Returns `Ok(None)` for
/// `External`, signaling the caller must supply its own implementation.
pub fn build(config: &BufferCacheConfig) -> Result<Option<Arc<dyn BufferCache>>, Status> {
    let cache: Arc<dyn BufferCache> = match config {
        BufferCacheConfig::Default => Arc::new(DefaultCache),
        BufferCacheConfig::KeepAll => Arc::new(KeepAllCache::new()),
        BufferCacheConfig::Lru { capacity_bytes } => Arc::new(LruCache::new(*capacity_bytes)),
        BufferCacheConfig::External => return Ok(None),
    };
    Ok(Some(cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_variant() {
        let config: BufferCacheConfig = serde_json::from_str(r#"{"type": "default"}"#).unwrap();
        assert!(build(&config).unwrap().is_some());
    }

    #[test]
    fn parses_lru_with_capacity() {
        let config: BufferCacheConfig =
            serde_json::from_str(r#"{"type": "lru", "capacity_bytes": 1024}"#).unwrap();
        assert!(build(&config).unwrap().is_some());
    }

    #[test]
    fn external_yields_no_built_in_cache() {
        let config: BufferCacheConfig = serde_json::from_str(r#"{"type": "external"}"#).unwrap();
        assert!(build(&config).unwrap().is_none());
    }
}
