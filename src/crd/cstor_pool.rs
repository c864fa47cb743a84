//! CStorPool CRD
//!
//! A zpool on one node that hosts cStor volume replicas. Pools are
//! identified by their object uid.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label carrying the name of the node a pool runs on
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

// =============================================================================
// CStorPool CRD
// =============================================================================

/// CStorPool represents a single zpool instance backing cStor replicas
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "openebs.io",
    version = "v1alpha1",
    kind = "CStorPool",
    plural = "cstorpools",
    shortname = "csp",
    status = "CStorPoolStatus",
    printcolumn = r#"{"name": "Type", "type": "string", "jsonPath": ".spec.poolSpec.poolType"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CStorPoolSpec {
    /// Disks making up the pool
    #[serde(default)]
    pub disks: DiskAttr,

    /// Zpool attributes
    #[serde(default)]
    pub pool_spec: CStorPoolAttr,
}

/// Disk related attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiskAttr {
    #[serde(default)]
    pub disk_list: Vec<String>,
}

/// Zpool related attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CStorPoolAttr {
    #[serde(default)]
    pub cache_file: String,

    /// mirrored, striped, raidz, raidz2
    #[serde(default)]
    pub pool_type: String,

    #[serde(default)]
    pub over_provisioning: bool,
}

/// Observed state of a pool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CStorPoolStatus {
    /// Pool phase (Online, Offline, ...)
    #[serde(default)]
    pub phase: String,
}

impl CStorPool {
    /// Object uid, which is the pool's identity for placement
    pub fn uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref().filter(|uid| !uid.is_empty())
    }

    /// Non-empty value of a label on this pool
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
