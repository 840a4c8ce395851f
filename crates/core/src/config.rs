//! Configuration types shared across crates.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `GALLERY_METADATA__PATH`.
pub const ENV_PREFIX: &str = "GALLERY_";

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only - SQLite cannot force-cancel queries).
        /// Callers enforce real limits through the request context.
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
        /// How long a connection waits on a locked database before giving up.
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(600) // 10 minutes (advisory only)
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/gallery.db"),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl MetadataConfig {
    /// SQLite configuration for the given path with default timeouts.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path, .. } if path.as_os_str().is_empty() => {
                Err("sqlite config requires a non-empty 'path'".to_string())
            }
            MetadataConfig::Sqlite {
                query_timeout_secs: Some(0),
                ..
            } => Err("sqlite 'query_timeout_secs' must be greater than zero".to_string()),
            MetadataConfig::Sqlite { .. } => Ok(()),
        }
    }
}

/// Resource core configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Upper bound on a single operation, applied on top of the caller's deadline.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Metadata store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Resource core configuration.
    #[serde(default)]
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, overridden by
    /// `GALLERY_`-prefixed environment variables (`__` separates sections).
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn extract(figment: Figment) -> crate::Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.metadata.validate().map_err(crate::Error::Config)?;
        Ok(config)
    }

    /// Create a test configuration backed by the given SQLite file.
    ///
    /// **For testing only.**
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            metadata: MetadataConfig::sqlite(path),
            service: ServiceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.metadata,
            MetadataConfig::Sqlite {
                path: PathBuf::from("./data/gallery.db"),
                query_timeout_secs: Some(600),
                busy_timeout_ms: 5000,
            }
        );
        assert!(config.service.request_timeout().is_none());
    }

    #[test]
    fn test_extract_from_toml() {
        let figment = Figment::from(Toml::string(
            r#"
            [metadata]
            type = "sqlite"
            path = "/var/lib/gallery/meta.db"
            busy_timeout_ms = 250

            [service]
            request_timeout_secs = 5
            "#,
        ));

        let config = AppConfig::extract(figment).unwrap();
        match &config.metadata {
            MetadataConfig::Sqlite {
                path,
                query_timeout_secs,
                busy_timeout_ms,
            } => {
                assert_eq!(path, &PathBuf::from("/var/lib/gallery/meta.db"));
                assert_eq!(*query_timeout_secs, Some(600));
                assert_eq!(*busy_timeout_ms, 250);
            }
        }
        assert_eq!(
            config.service.request_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_extract_rejects_invalid_metadata() {
        let figment = Figment::from(Toml::string(
            r#"
            [metadata]
            type = "sqlite"
            path = ""
            "#,
        ));
        assert!(matches!(
            AppConfig::extract(figment),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_zero_query_timeout() {
        let config = MetadataConfig::Sqlite {
            path: PathBuf::from("x.db"),
            query_timeout_secs: Some(0),
            busy_timeout_ms: 1,
        };
        assert!(config.validate().is_err());
        assert!(MetadataConfig::sqlite("x.db").validate().is_ok());
    }
}
