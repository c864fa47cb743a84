//! Selector Configuration
//!
//! Settings for the selector service. Values come from an optional YAML
//! file and are then overridden by command line flags or environment.

use crate::error::{Error, Result};
use crate::index::KubeIndexConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Configuration for the selector service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// REST API bind address
    pub api_addr: SocketAddr,
    /// Health server bind address
    pub health_addr: SocketAddr,
    /// Metrics server bind address
    pub metrics_addr: SocketAddr,
    /// Upper bound for a single template call, in seconds
    pub request_timeout_secs: u64,
    /// Materialise the replica index once per request
    pub frozen_snapshot: bool,
    /// Kubernetes index settings
    pub index: KubeIndexConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_secs: 30,
            frozen_snapshot: false,
            index: KubeIndexConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ServerConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that the type system does not
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::Configuration(
                "requestTimeoutSecs must be greater than zero".into(),
            ));
        }
        if self.index.pool_uid_label.is_empty() {
            return Err(Error::Configuration("index.poolUidLabel must not be empty".into()));
        }
        if self.index.host_label.is_empty() {
            return Err(Error::Configuration("index.hostLabel must not be empty".into()));
        }
        if matches!(&self.index.replica_namespace, Some(ns) if ns.is_empty()) {
            return Err(Error::Configuration(
                "index.replicaNamespace must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}
