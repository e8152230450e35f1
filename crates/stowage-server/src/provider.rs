use std::sync::Arc;

use stowage_backend::{build_database, Database};
use stowage_buffer::BufferCache;
use stowage_types::{Access, Mode, Status};

use crate::config::ProviderConfig;

/// A process-wide actor bound to a network endpoint and a 16-bit id; owns
/// exactly one database and one buffer cache. Constructed once at startup;
/// the database and buffer cache outlive every RPC the provider serves.
pub struct Provider {
    pub id: u16,
    pub database: Arc<dyn Database>,
    pub buffer_cache: Arc<dyn BufferCache>,
}

impl Provider {
    pub fn new(id: u16, config: &ProviderConfig) -> Result<Provider, Status> {
        let database = build_database(&config.database.type_tag, &config.database.config)?;
        let buffer_cache = stowage_buffer::build(&config.buffer_cache)?
            .ok_or(Status::ErrInvalidConfig)?;
        Ok(Provider {
            id,
            database,
            buffer_cache,
        })
    }

    /// Builds a provider around an externally supplied buffer cache, for
    /// the configuration's `buffer_cache.type == "external"` case.
    pub fn with_buffer_cache(
        id: u16,
        config: &ProviderConfig,
        buffer_cache: Arc<dyn BufferCache>,
    ) -> Result<Provider, Status> {
        let database = build_database(&config.database.type_tag, &config.database.config)?;
        Ok(Provider {
            id,
            database,
            buffer_cache,
        })
    }

    /// Common preamble step 5: acquire one scratch buffer sized for the
    /// whole operation before touching the backend, release it on the way
    /// out. Handlers that already hold their argument bytes in decoded
    /// records don't need the buffer's storage, only the acquire/release
    /// accounting the cache policies track.
    pub fn with_scratch_buffer<R>(&self, size: usize, access: Access, f: impl FnOnce() -> R) -> R {
        let buffer = self.buffer_cache.get(size, access);
        let result = f();
        self.buffer_cache.release(buffer);
        result
    }
}

/// Validates `mode` before the backend is consulted, per the uniform
/// data-plane preamble: reject incompatible bit combinations, then reject
/// bits the backend doesn't support.
pub fn validate_mode(database: &dyn Database, mode: Mode) -> Result<(), Status> {
    mode.check()?;
    if !database.supports_mode(mode) {
        return Err(Status::ErrInvalidMode);
    }
    Ok(())
}
