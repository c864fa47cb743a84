//! CStorVolumeReplica CRD
//!
//! One replica of a cStor volume, resident on exactly one cStor pool. The
//! hosting pool is recorded in the `cstorpool.openebs.io/uid` label.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label carrying the uid of the pool that hosts a replica
pub const CSTOR_POOL_UID_LABEL: &str = "cstorpool.openebs.io/uid";

// =============================================================================
// CStorVolumeReplica CRD
// =============================================================================

/// CStorVolumeReplica describes a single replica of a cStor volume
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "openebs.io",
    version = "v1alpha1",
    kind = "CStorVolumeReplica",
    plural = "cstorvolumereplicas",
    shortname = "cvr",
    status = "CStorVolumeReplicaStatus",
    printcolumn = r#"{"name": "Capacity", "type": "string", "jsonPath": ".spec.capacity"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CStorVolumeReplicaSpec {
    /// Address of the volume target this replica serves
    #[serde(default, rename = "targetIP")]
    pub target_ip: String,

    /// Replica capacity (e.g. "5G")
    #[serde(default)]
    pub capacity: String,
}

/// Observed state of a replica
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CStorVolumeReplicaStatus {
    /// Replica phase (Online, Offline, Degraded, ...)
    #[serde(default)]
    pub phase: String,
}

impl CStorVolumeReplica {
    /// Non-empty value of a label on this replica
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn test_label() {
        let mut cvr = CStorVolumeReplica::new("pvc-1-pool-a", CStorVolumeReplicaSpec::default());
        assert_eq!(cvr.label(CSTOR_POOL_UID_LABEL), None);

        cvr.metadata = ObjectMeta {
            labels: Some(BTreeMap::from([
                (CSTOR_POOL_UID_LABEL.to_string(), "uid-a".to_string()),
                ("openebs.io/replica-anti-affinity".to_string(), String::new()),
            ])),
            ..Default::default()
        };
        assert_eq!(cvr.label(CSTOR_POOL_UID_LABEL), Some("uid-a"));
        assert_eq!(cvr.label("openebs.io/replica-anti-affinity"), None);
    }

    #[test]
    fn test_spec_deserialization() {
        let spec: CStorVolumeReplicaSpec =
            serde_json::from_str(r#"{"targetIP": "10.0.0.12", "capacity": "5G"}"#).unwrap();
        assert_eq!(spec.target_ip, "10.0.0.12");
        assert_eq!(spec.capacity, "5G");
    }
}
