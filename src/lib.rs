//! cStor Pool Selector
//!
//! Chooses which cStor storage pools may host a new volume replica. Each
//! provisioning request carries candidate pool ids and a set of placement
//! policies; the policies run in order and narrow the candidates against
//! what is already placed in the cluster.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            Template functions / REST API                      │
//! │  cspGetPolicyByLabelSelector  cspFilter  cspAntiAffinity ...  │
//! └───────────────────────────────┬──────────────────────────────┘
//!                                 │
//!                    ┌────────────┴────────────┐
//!                    │   Selection (policies)  │
//!                    └────────────┬────────────┘
//!                                 │ ClusterView
//!              ┌──────────────────┴──────────────────┐
//!   ┌──────────┴──────────┐              ┌───────────┴─────────┐
//!   │    ReplicaIndex     │              │    PoolHostIndex    │
//!   │ CStorVolumeReplica  │              │      CStorPool      │
//!   └─────────────────────┘              └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`selection`]: Policies, the policy factory and the selection chain
//! - [`template`]: Name-addressable functions for provisioning templates
//! - [`index`]: Kubernetes-backed and snapshot indexes
//! - [`api`]: REST server over the template functions
//! - [`crd`]: cStor custom resources read by the indexes
//! - [`domain`]: Pool ids, selectors and index ports
//! - [`error`]: Error types and handling

pub mod api;
pub mod config;
pub mod crd;
pub mod domain;
pub mod error;
pub mod index;
pub mod metrics;
pub mod selection;
pub mod template;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter, RestSettings};

pub use config::ServerConfig;

pub use crd::{CStorPool, CStorVolumeReplica};

pub use domain::ports::{
    ClusterView, LabelSelector, PoolHostIndex, PoolHostIndexRef, PoolId, ReplicaIndex,
    ReplicaIndexRef,
};

pub use error::{Error, Result};

pub use index::{
    KubeIndexConfig, KubePoolHostIndex, KubeReplicaIndex, ReplicaRecord, ReplicaSnapshot,
    StaticPoolHosts,
};

pub use metrics::SelectorMetrics;

pub use selection::{filter_pool_ids, Policy, PolicyName, PolicyOption, Selection};

pub use template::TemplateFunctions;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
