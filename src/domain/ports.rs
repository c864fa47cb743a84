//! Domain Ports - Core trait definitions for the pool selector
//!
//! These traits define the boundaries between the selection engine and the
//! cluster state it reads. Adapters implement these traits to provide
//! concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier of a storage pool.
///
/// Compared byte for byte. Adapters never hand out empty ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PoolId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Label selector in the cluster's `key=value,key2=value2` syntax.
///
/// The engine forwards it verbatim; only index adapters interpret it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector(String);

impl LabelSelector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelSelector {
    fn from(selector: &str) -> Self {
        Self(selector.to_string())
    }
}

impl From<String> for LabelSelector {
    fn from(selector: String) -> Self {
        Self(selector)
    }
}

// =============================================================================
// Replica Index Port
// =============================================================================

/// Read-only view of the cluster's replica registry
#[async_trait]
pub trait ReplicaIndex: Send + Sync {
    /// Pools hosting at least one replica that matches `selector`.
    ///
    /// Order is unspecified and a pool may be listed once per matching
    /// replica.
    async fn replicas_by_label(&self, selector: &LabelSelector) -> Result<Vec<PoolId>>;

    /// Materialise a frozen view to be used for the rest of one request.
    ///
    /// Indexes that already answer from a consistent snapshot return `None`.
    async fn freeze(&self) -> Result<Option<ReplicaIndexRef>> {
        Ok(None)
    }
}

// =============================================================================
// Pool Host Index Port
// =============================================================================

/// Read-only view of which pools are pinned to which host
#[async_trait]
pub trait PoolHostIndex: Send + Sync {
    /// Pools scheduled on `host`
    async fn pools_on_host(&self, host: &str) -> Result<Vec<PoolId>>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ReplicaIndexRef = Arc<dyn ReplicaIndex>;
pub type PoolHostIndexRef = Arc<dyn PoolHostIndex>;

// =============================================================================
// Cluster View
// =============================================================================

/// Collaborators a selection reads while filtering
#[derive(Clone)]
pub struct ClusterView {
    replicas: ReplicaIndexRef,
    hosts: Option<PoolHostIndexRef>,
}

impl ClusterView {
    pub fn new(replicas: ReplicaIndexRef) -> Self {
        Self {
            replicas,
            hosts: None,
        }
    }

    pub fn with_hosts(mut self, hosts: PoolHostIndexRef) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn replicas(&self) -> &dyn ReplicaIndex {
        self.replicas.as_ref()
    }

    pub fn hosts(&self) -> Option<&dyn PoolHostIndex> {
        self.hosts.as_deref()
    }

    /// Swap the replica index for a frozen view when the index offers one
    pub async fn frozen(&self) -> Result<Self> {
        match self.replicas.freeze().await? {
            Some(snapshot) => Ok(Self {
                replicas: snapshot,
                hosts: self.hosts.clone(),
            }),
            None => Ok(self.clone()),
        }
    }
}

impl std::fmt::Debug for ClusterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterView")
            .field("hosts", &self.hosts.is_some())
            .finish_non_exhaustive()
    }
}
