//! Configuration
//!
//! Read from `qail-cql.toml`, `.qail/cql.toml` or `<config dir>/qail/cql.toml`,
//! first match wins:
//!
//! ```toml
//! [paging]
//! serializer = "safe"     # or "simple"
//! secret = "change-me"
//! ```
//!
//! `QAIL_CQL_PAGING_SECRET` overrides `paging.secret`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{CqlError, CqlResult};
use crate::paging::{PagingStateSerializer, SafeSerializer, SimpleSerializer};

/// Environment variable overriding the paging secret.
pub const PAGING_SECRET_ENV: &str = "QAIL_CQL_PAGING_SECRET";

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CqlConfig {
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Paging token settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagingConfig {
    #[serde(default)]
    pub serializer: SerializerKind,

    /// HMAC key for the safe serializer; the built-in key when unset.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// Signed and bound to the query fingerprint.
    #[default]
    Safe,
    /// Raw paging state.
    Simple,
}

impl CqlConfig {
    /// Create a new configuration builder
    pub fn builder() -> CqlConfigBuilder {
        CqlConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> CqlResult<Self> {
        toml::from_str(content).map_err(|e| CqlError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> CqlResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from the first config file found, then apply environment overrides.
    /// No config file means defaults.
    pub fn load() -> CqlResult<Self> {
        let mut config = match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Loading CQL config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Candidate config files, in priority order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("qail-cql.toml"), PathBuf::from(".qail/cql.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("qail").join("cql.toml"));
        }
        paths
    }

    /// Apply overrides from a variable lookup such as `std::env::var`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(PAGING_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.paging.secret = Some(secret);
        }
    }

    /// The configured paging serializer.
    pub fn paging_serializer(&self) -> Arc<dyn PagingStateSerializer> {
        match self.paging.serializer {
            SerializerKind::Safe => match &self.paging.secret {
                Some(secret) => Arc::new(SafeSerializer::with_secret(secret)),
                None => Arc::new(SafeSerializer::new()),
            },
            SerializerKind::Simple => {
                if self.paging.secret.is_some() {
                    tracing::warn!("paging.secret is ignored by the simple serializer");
                }
                Arc::new(SimpleSerializer)
            }
        }
    }
}

/// Builder for CqlConfig
#[derive(Debug, Default)]
pub struct CqlConfigBuilder {
    config: CqlConfig,
}

impl CqlConfigBuilder {
    pub fn serializer(mut self, kind: SerializerKind) -> Self {
        self.config.paging.serializer = kind;
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.paging.secret = Some(secret.into());
        self
    }

    pub fn build(self) -> CqlConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::{PagingState, QueryFingerprint};

    #[test]
    fn test_defaults() {
        let config = CqlConfig::from_toml_str("").unwrap();
        assert_eq!(config.paging.serializer, SerializerKind::Safe);
        assert_eq!(config.paging.secret, None);
    }

    #[test]
    fn test_parse_toml() {
        let config = CqlConfig::from_toml_str(
            r#"
            [paging]
            serializer = "simple"
            secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.paging.serializer, SerializerKind::Simple);
        assert_eq!(config.paging.secret.as_deref(), Some("s3cret"));

        assert!(matches!(
            CqlConfig::from_toml_str("[paging]\nserializer = \"fast\""),
            Err(CqlError::Config(_))
        ));
    }

    #[test]
    fn test_env_override() {
        let mut config = CqlConfig::builder().secret("file").build();
        config.apply_overrides(|key| (key == PAGING_SECRET_ENV).then(|| "env".to_string()));
        assert_eq!(config.paging.secret.as_deref(), Some("env"));

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.paging.secret.as_deref(), Some("env"));
    }

    #[test]
    fn test_serializer_uses_secret() {
        let fp = QueryFingerprint::new("SELECT 1");
        let state = PagingState::new(vec![1, 2]);
        let signed = CqlConfig::builder()
            .secret("k1")
            .build()
            .paging_serializer()
            .serialize(&state, &fp)
            .unwrap();

        let same = CqlConfig::builder().secret("k1").build().paging_serializer();
        let other = CqlConfig::builder().secret("k2").build().paging_serializer();
        assert_eq!(same.deserialize(&signed, &fp).unwrap(), state);
        assert!(other.deserialize(&signed, &fp).is_err());
    }

    #[test]
    fn test_search_paths_order() {
        let paths = CqlConfig::search_paths();
        assert_eq!(paths[0], PathBuf::from("qail-cql.toml"));
        assert_eq!(paths[1], PathBuf::from(".qail/cql.toml"));
    }
}
