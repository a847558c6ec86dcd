//! Configuration module
//!
//! Settings for the storage backend, the remote data service and the upload pipeline,
//! loaded from the environment (and an optional `.env` file).

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_PROGRESS_TICK_MS, DEFAULT_SIGNED_URL_EXPIRY_SECS, DEFAULT_UPLOAD_CACHE_CONTROL_SECS,
};
use crate::storage_types::StorageBackend;

const HTTP_TIMEOUT_SECS: u64 = 60;

/// Campus client configuration
#[derive(Clone, Debug)]
pub struct CampusConfig {
    pub environment: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub storage_api_url: Option<String>,
    pub storage_api_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Remote data service
    pub data_api_url: Option<String>,
    pub data_api_key: Option<String>,
    // Upload behaviour
    pub signed_url_expiry_secs: u64,
    pub upload_cache_control_secs: u64,
    pub progress_tick_ms: u64,
    pub http_timeout_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<CampusConfig>);

impl Config {
    fn inner(&self) -> &CampusConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = CampusConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    /// In-memory configuration used by tests and dry runs.
    pub fn in_memory() -> Self {
        Config(Box::new(CampusConfig::in_memory()))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.inner().environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn storage_api_url(&self) -> Option<&str> {
        self.inner().storage_api_url.as_deref()
    }

    pub fn storage_api_key(&self) -> Option<&str> {
        self.inner().storage_api_key.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    /// Data service URL, defaulting to the storage service URL (same hosted project).
    pub fn data_api_url(&self) -> Option<&str> {
        self.inner()
            .data_api_url
            .as_deref()
            .or_else(|| self.storage_api_url())
    }

    pub fn data_api_key(&self) -> Option<&str> {
        self.inner()
            .data_api_key
            .as_deref()
            .or_else(|| self.storage_api_key())
    }

    pub fn signed_url_expiry(&self) -> Duration {
        Duration::from_secs(self.inner().signed_url_expiry_secs)
    }

    pub fn upload_cache_control_secs(&self) -> u64 {
        self.inner().upload_cache_control_secs
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.inner().progress_tick_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().http_timeout_secs)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl CampusConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Rest,
        };

        let config = CampusConfig {
            environment,
            storage_backend,
            storage_api_url: env_opt("STORAGE_API_URL"),
            storage_api_key: env_opt("STORAGE_API_KEY"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            data_api_url: env_opt("DATA_API_URL"),
            data_api_key: env_opt("DATA_API_KEY"),
            signed_url_expiry_secs: env_u64("SIGNED_URL_EXPIRY_SECS", DEFAULT_SIGNED_URL_EXPIRY_SECS),
            upload_cache_control_secs: env_u64(
                "UPLOAD_CACHE_CONTROL_SECS",
                DEFAULT_UPLOAD_CACHE_CONTROL_SECS,
            ),
            progress_tick_ms: env_u64("PROGRESS_TICK_MS", DEFAULT_PROGRESS_TICK_MS),
            http_timeout_secs: env_u64("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS),
        };

        config.validate()?;
        tracing::debug!(
            backend = %config.storage_backend,
            environment = %config.environment,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn in_memory() -> Self {
        CampusConfig {
            environment: "test".to_string(),
            storage_backend: StorageBackend::Memory,
            storage_api_url: None,
            storage_api_key: None,
            local_storage_path: None,
            local_storage_base_url: None,
            data_api_url: None,
            data_api_key: None,
            signed_url_expiry_secs: DEFAULT_SIGNED_URL_EXPIRY_SECS,
            upload_cache_control_secs: DEFAULT_UPLOAD_CACHE_CONTROL_SECS,
            progress_tick_ms: DEFAULT_PROGRESS_TICK_MS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::Rest => {
                let url = self.storage_api_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("STORAGE_API_URL must be set when using the rest storage backend")
                })?;
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(anyhow::anyhow!(
                        "STORAGE_API_URL must be an http(s) URL"
                    ));
                }
                if self.storage_api_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_API_KEY must be set when using the rest storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        if self.signed_url_expiry_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_EXPIRY_SECS must be positive"));
        }
        if self.progress_tick_ms == 0 {
            return Err(anyhow::anyhow!("PROGRESS_TICK_MS must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_config_is_valid() {
        let config = Config::in_memory();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_backend(), StorageBackend::Memory);
        assert_eq!(config.signed_url_expiry(), Duration::from_secs(3600));
        assert!(!config.is_production());
    }

    #[test]
    fn rest_backend_requires_url_and_key() {
        let mut config = CampusConfig::in_memory();
        config.storage_backend = StorageBackend::Rest;
        assert!(config.validate().is_err());

        config.storage_api_url = Some("ftp://example.org".to_string());
        config.storage_api_key = Some("anon".to_string());
        assert!(config.validate().is_err());

        config.storage_api_url = Some("https://project.example.org".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn local_backend_requires_path_and_base_url() {
        let mut config = CampusConfig::in_memory();
        config.storage_backend = StorageBackend::Local;
        config.local_storage_path = Some("/tmp/campus".to_string());
        assert!(config.validate().is_err());
        config.local_storage_base_url = Some("http://localhost:8080/files".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn data_service_defaults_to_storage_project() {
        let mut inner = CampusConfig::in_memory();
        inner.storage_api_url = Some("https://project.example.org".to_string());
        inner.storage_api_key = Some("anon".to_string());
        let config = Config(Box::new(inner));
        assert_eq!(config.data_api_url(), Some("https://project.example.org"));
        assert_eq!(config.data_api_key(), Some("anon"));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let mut config = CampusConfig::in_memory();
        config.progress_tick_ms = 0;
        assert!(config.validate().is_err());
    }
}
