//! Configuration management for the file bridge
//!
//! Values come from an optional `config.toml` layered with `FILEIO__*`
//! environment variables, e.g. `FILEIO__STORAGE__BACKEND=memory`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::service::{DEFAULT_CAPACITY, ServiceOptions};
use crate::storage::{Backend, LocalBackend, MemoryBackend};

/// Largest concurrency cap accepted for the listener.
const MAX_LISTENER_CONNECTIONS: usize = 4096;

/// Complete bridge configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub storage: StorageConfig,
    pub service: ServiceConfig,
    pub listener: ListenerConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Local,
}

/// Where and how big the store is (restart required)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,

    /// Host directory backing the `local` store
    pub root: String,

    /// Capacity requested when the store is opened
    pub capacity_bytes: u64,

    /// Longest inbound line accepted on the host channel
    pub max_message_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            root: "./storage_root".to_string(),
            capacity_bytes: DEFAULT_CAPACITY,
            max_message_bytes: 8 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Return directory listings in lexicographic order
    pub sorted_listing: bool,

    /// Per-command deadline in seconds, 0 disables it
    pub operation_timeout_secs: u64,
}

/// Peripheral loopback listener
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListenerConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
    pub max_connections: usize,
    pub read_timeout_secs: u64,
    pub response: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: 16,
            read_timeout_secs: 60,
            response: "This is the response".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from `path` (extension optional, file optional)
    /// with environment overrides
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FILEIO").separator("__"))
            .build()?;

        let config: BridgeConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.capacity_bytes == 0 {
            return Err(ConfigError::Message(
                "storage.capacity_bytes must be greater than 0".into(),
            ));
        }

        if self.storage.backend == BackendKind::Local && self.storage.root.is_empty() {
            return Err(ConfigError::Message(
                "storage.root cannot be empty for the local backend".into(),
            ));
        }

        if self.storage.max_message_bytes == 0 {
            return Err(ConfigError::Message(
                "storage.max_message_bytes must be greater than 0".into(),
            ));
        }

        if self.listener.enabled {
            if self.listener.max_connections == 0
                || self.listener.max_connections > MAX_LISTENER_CONNECTIONS
            {
                return Err(ConfigError::Message(format!(
                    "listener.max_connections must be between 1 and {MAX_LISTENER_CONNECTIONS}"
                )));
            }

            if self.listener.bind_address.is_empty() {
                return Err(ConfigError::Message(
                    "listener.bind_address cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Construct the configured backend
    pub fn build_backend(&self) -> Box<dyn Backend> {
        match self.storage.backend {
            BackendKind::Memory => Box::new(MemoryBackend::new()),
            BackendKind::Local => Box::new(LocalBackend::new(self.storage.root_path())),
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            capacity: self.storage.capacity_bytes,
            sorted_listing: self.service.sorted_listing,
            operation_timeout: self.service.operation_timeout(),
        }
    }
}

impl StorageConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }
}

impl ServiceConfig {
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }
}

impl ListenerConfig {
    /// Bind address and port as a socket address string
    pub fn socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
