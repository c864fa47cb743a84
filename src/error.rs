//! Error types for the cStor pool selector
//!
//! Provides structured error types for the selection engine, the cluster
//! index adapters, the template surface and the API server.

use crate::selection::PolicyName;
use thiserror::Error;

/// Unified error type for the selector
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // Cluster Index Errors
    // =========================================================================
    #[error("Replica index error: {0}")]
    ReplicaIndex(String),

    #[error("Pool host index error: {0}")]
    PoolHostIndex(String),

    #[error("Invalid label selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    // =========================================================================
    // Selection Errors
    // =========================================================================
    /// The message is matched on by operators and must not change.
    #[error("invalid selection: both antiAffinityLabel and preferAntiAffinityLabel policies can not be together")]
    IncompatiblePolicies,

    #[error("{policy}: {source}")]
    Policy {
        policy: PolicyName,
        source: Box<Error>,
    },

    // =========================================================================
    // Template Errors
    // =========================================================================
    #[error("unknown template function: {name}")]
    UnknownTemplateFunction { name: String },

    #[error("Invalid arguments for {function}: {reason}")]
    TemplateArgument { function: String, reason: String },

    // =========================================================================
    // API Errors
    // =========================================================================
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error raised while evaluating the named policy
    pub fn in_policy(policy: PolicyName, source: Error) -> Self {
        Error::Policy {
            policy,
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through policy prefixes
    pub fn root(&self) -> &Error {
        match self {
            Error::Policy { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            Error::Kube(_)
                | Error::ReplicaIndex(_)
                | Error::PoolHostIndex(_)
                | Error::Timeout { .. }
        )
    }

    /// Check if retrying the same placement request can succeed
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Error::IncompatiblePolicies
            | Error::InvalidSelector { .. }
            | Error::Configuration(_)
            | Error::UnknownTemplateFunction { .. }
            | Error::TemplateArgument { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_) => false,
            _ => true,
        }
    }
}

/// Result type alias for the selector
pub type Result<T> = std::result::Result<T, Error>;
