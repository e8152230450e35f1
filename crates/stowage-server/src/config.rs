use std::path::Path;

use serde::Deserialize;
use stowage_buffer::BufferCacheConfig;
use stowage_types::Status;

/// The `database` section of a provider's JSON configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default = "default_database_config")]
    pub config: serde_json::Value,
}

fn default_database_config() -> serde_json::Value {
    serde_json::json!({})
}

/// A provider's full JSON configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub database: DatabaseConfig,
    pub buffer_cache: BufferCacheConfig,
}

impl ProviderConfig {
    pub fn from_json(text: &str) -> Result<Self, Status> {
        serde_json::from_str(text).map_err(|error| {
            tracing::warn!(%error, "failed to parse provider configuration");
            Status::ErrInvalidConfig
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Status> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            tracing::warn!(%error, "failed to read provider configuration file");
            Status::ErrInvalidConfig
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_configuration() {
        let config = ProviderConfig::from_json(
            r#"{
                "database": {"type": "hash_map"},
                "buffer_cache": {"type": "default"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.database.type_tag, "hash_map");
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let result = ProviderConfig::from_json(
            r#"{
                "database": {"type": "hash_map"},
                "buffer_cache": {"type": "default"},
                "unexpected": true
            }"#,
        );
        assert!(result.is_err());
    }
}
