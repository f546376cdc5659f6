//! Service configuration

use anyhow::Result;
use price_lib::{LoadOptions, DEFAULT_MODEL_PATH};
use serde::Deserialize;

/// Environment variable prefix, e.g. `PRICE_API_MODEL_PATH`
pub const ENV_PREFIX: &str = "PRICE_API";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Path to the model bundle
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Validate the bundle's feature order against the request schema at startup
    #[serde(default = "default_strict_features")]
    pub strict_features: bool,

    /// Expected SHA-256 of the bundle file
    #[serde(default)]
    pub model_sha256: Option<String>,
}

fn default_model_path() -> String {
    DEFAULT_MODEL_PATH.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_strict_features() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            host: default_host(),
            port: default_port(),
            strict_features: default_strict_features(),
            model_sha256: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder().add_source(config::Environment::with_prefix(ENV_PREFIX)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict_features: self.strict_features,
            expected_sha256: self
                .model_sha256
                .clone()
                .filter(|digest| !digest.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let config = ServiceConfig::from_builder(config::Config::builder()).unwrap();
        assert_eq!(config.model_path, "randomforest_pipeline.json");
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert!(config.strict_features);
        assert!(config.model_sha256.is_none());
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("model_path", "/models/bundle.json")
            .unwrap()
            .set_override("port", "9090")
            .unwrap()
            .set_override("strict_features", "false")
            .unwrap()
            .set_override("model_sha256", "abc123")
            .unwrap();
        let config = ServiceConfig::from_builder(builder).unwrap();

        assert_eq!(config.model_path, "/models/bundle.json");
        assert_eq!(config.port, 9090);

        let options = config.load_options();
        assert!(!options.strict_features);
        assert_eq!(options.expected_sha256.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_digest_ignored() {
        let config = ServiceConfig {
            model_sha256: Some("  ".to_string()),
            ..ServiceConfig::default()
        };
        assert!(config.load_options().expected_sha256.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let builder = config::Config::builder()
            .set_override("port", "not-a-port")
            .unwrap();
        assert!(ServiceConfig::from_builder(builder).is_err());
    }
}
