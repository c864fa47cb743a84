//! Kubernetes Cluster Views
//!
//! Answers replica and host queries by listing cStor custom resources from
//! the API server.

use crate::crd::{CStorPool, CStorVolumeReplica, CSTOR_POOL_UID_LABEL, HOSTNAME_LABEL};
use crate::domain::ports::{
    LabelSelector, PoolHostIndex, PoolId, ReplicaIndex, ReplicaIndexRef,
};
use crate::error::Result;
use crate::index::snapshot::{ReplicaRecord, ReplicaSnapshot};
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Kubernetes-backed indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubeIndexConfig {
    /// Namespace to list replicas from; all namespaces when unset
    pub replica_namespace: Option<String>,
    /// Replica label holding the uid of the hosting pool
    pub pool_uid_label: String,
    /// Pool label naming the node the pool runs on
    pub host_label: String,
}

impl Default for KubeIndexConfig {
    fn default() -> Self {
        Self {
            replica_namespace: None,
            pool_uid_label: CSTOR_POOL_UID_LABEL.to_string(),
            host_label: HOSTNAME_LABEL.to_string(),
        }
    }
}

// =============================================================================
// Replica Index
// =============================================================================

/// Replica index backed by `CStorVolumeReplica` resources
#[derive(Clone)]
pub struct KubeReplicaIndex {
    client: Client,
    config: KubeIndexConfig,
}

impl KubeReplicaIndex {
    pub fn new(client: Client, config: KubeIndexConfig) -> Self {
        Self { client, config }
    }

    fn api(&self) -> Api<CStorVolumeReplica> {
        match &self.config.replica_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn list(&self, params: &ListParams) -> Result<Vec<CStorVolumeReplica>> {
        Ok(self.api().list(params).await?.items)
    }
}

#[async_trait]
impl ReplicaIndex for KubeReplicaIndex {
    async fn replicas_by_label(&self, selector: &LabelSelector) -> Result<Vec<PoolId>> {
        let replicas = self
            .list(&ListParams::default().labels(selector.as_str()))
            .await?;
        let pools = hosting_pools(&replicas, &self.config.pool_uid_label);

        debug!(
            "Selector {} matched {} replicas on {} pools",
            selector,
            replicas.len(),
            pools.len()
        );
        Ok(pools)
    }

    async fn freeze(&self) -> Result<Option<ReplicaIndexRef>> {
        let replicas = self.list(&ListParams::default()).await?;
        let records = replica_records(&replicas, &self.config.pool_uid_label);

        debug!("Froze replica index with {} replicas", records.len());
        Ok(Some(Arc::new(ReplicaSnapshot::new(records))))
    }
}

/// Pool uid of every replica carrying one
fn hosting_pools(replicas: &[CStorVolumeReplica], pool_uid_label: &str) -> Vec<PoolId> {
    replicas
        .iter()
        .filter_map(|cvr| cvr.label(pool_uid_label))
        .map(PoolId::from)
        .collect()
}

fn replica_records(replicas: &[CStorVolumeReplica], pool_uid_label: &str) -> Vec<ReplicaRecord> {
    replicas
        .iter()
        .filter_map(|cvr| {
            let pool_id = cvr.label(pool_uid_label)?;
            Some(ReplicaRecord {
                pool_id: PoolId::from(pool_id),
                labels: cvr.metadata.labels.clone().unwrap_or_default(),
            })
        })
        .collect()
}

// =============================================================================
// Pool Host Index
// =============================================================================

/// Pool host index backed by `CStorPool` resources
#[derive(Clone)]
pub struct KubePoolHostIndex {
    client: Client,
    config: KubeIndexConfig,
}

impl KubePoolHostIndex {
    pub fn new(client: Client, config: KubeIndexConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PoolHostIndex for KubePoolHostIndex {
    async fn pools_on_host(&self, host: &str) -> Result<Vec<PoolId>> {
        let api: Api<CStorPool> = Api::all(self.client.clone());
        let cstor_pools = api.list(&ListParams::default()).await?.items;
        let pinned = pools_pinned_to(&cstor_pools, &self.config.host_label, host);

        debug!("Host {} has {} of {} pools", host, pinned.len(), cstor_pools.len());
        Ok(pinned)
    }
}

/// Uids of the pools whose `host_label` names `host`
fn pools_pinned_to(cstor_pools: &[CStorPool], host_label: &str, host: &str) -> Vec<PoolId> {
    cstor_pools
        .iter()
        .filter(|pool| pool.label(host_label) == Some(host))
        .filter_map(|pool| pool.uid())
        .map(PoolId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CStorPoolSpec, CStorVolumeReplicaSpec};
    use std::collections::BTreeMap;

    fn cvr(name: &str, labels: &[(&str, &str)]) -> CStorVolumeReplica {
        let mut cvr = CStorVolumeReplica::new(name, CStorVolumeReplicaSpec::default());
        cvr.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        cvr
    }

    fn csp(name: &str, uid: &str, host: Option<&str>) -> CStorPool {
        let mut pool = CStorPool::new(name, CStorPoolSpec::default());
        pool.metadata.uid = Some(uid.to_string());
        pool.metadata.labels =
            host.map(|h| BTreeMap::from([(HOSTNAME_LABEL.to_string(), h.to_string())]));
        pool
    }

    #[test]
    fn test_default_config() {
        let config = KubeIndexConfig::default();
        assert_eq!(config.replica_namespace, None);
        assert_eq!(config.pool_uid_label, "cstorpool.openebs.io/uid");
        assert_eq!(config.host_label, "kubernetes.io/hostname");
    }

    #[test]
    fn test_hosting_pools_skips_unlabelled_replicas() {
        let replicas = vec![
            cvr("r1", &[(CSTOR_POOL_UID_LABEL, "uid-a")]),
            cvr("r2", &[]),
            cvr("r3", &[(CSTOR_POOL_UID_LABEL, "")]),
            cvr("r4", &[(CSTOR_POOL_UID_LABEL, "uid-a")]),
        ];

        let pools = hosting_pools(&replicas, CSTOR_POOL_UID_LABEL);
        assert_eq!(pools, vec![PoolId::from("uid-a"), PoolId::from("uid-a")]);
    }

    #[tokio::test]
    async fn test_replica_records_feed_snapshot() {
        let replicas = vec![
            cvr(
                "r1",
                &[
                    (CSTOR_POOL_UID_LABEL, "uid-a"),
                    ("openebs.io/replica-anti-affinity", "app-1"),
                ],
            ),
            cvr(
                "r2",
                &[
                    (CSTOR_POOL_UID_LABEL, "uid-b"),
                    ("openebs.io/replica-anti-affinity", "app-2"),
                ],
            ),
            cvr("r3", &[("openebs.io/replica-anti-affinity", "app-1")]),
        ];

        let snapshot = ReplicaSnapshot::new(replica_records(&replicas, CSTOR_POOL_UID_LABEL));
        assert_eq!(snapshot.len(), 2);

        let pools = snapshot
            .replicas_by_label(&"openebs.io/replica-anti-affinity=app-1".into())
            .await
            .unwrap();
        assert_eq!(pools, vec![PoolId::from("uid-a")]);
    }

    #[test]
    fn test_host_comes_from_hostname_label() {
        let mut annotated = csp("pool-x", "uid-x", None);
        annotated.metadata.annotations = Some(BTreeMap::from([(
            "volume.kubernetes.io/selected-node".to_string(),
            "node-1".to_string(),
        )]));
        let labelled = csp("pool-a", "uid-a", Some("node-1"));

        let pinned = pools_pinned_to(
            &[annotated, labelled],
            &KubeIndexConfig::default().host_label,
            "node-1",
        );
        assert_eq!(pinned, vec![PoolId::from("uid-a")]);
    }

    #[test]
    fn test_pools_pinned_to_host() {
        let cstor_pools = vec![
            csp("pool-a", "uid-a", Some("node-1")),
            csp("pool-b", "uid-b", Some("node-2")),
            csp("pool-c", "uid-c", None),
            csp("pool-d", "uid-d", Some("node-1")),
        ];

        let host_label = KubeIndexConfig::default().host_label;
        let pinned = pools_pinned_to(&cstor_pools, &host_label, "node-1");
        assert_eq!(pinned, vec![PoolId::from("uid-a"), PoolId::from("uid-d")]);
        assert!(pools_pinned_to(&cstor_pools, &host_label, "node-9").is_empty());
    }
}
