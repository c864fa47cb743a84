//! In-memory Cluster Views
//!
//! Frozen copies of replica and pool placement, used to give every policy in
//! one request the same consistent picture of the cluster.

use crate::domain::ports::{LabelSelector, PoolHostIndex, PoolId, ReplicaIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Replica Snapshot
// =============================================================================

/// A replica as seen by the snapshot: its pool and its labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    pub pool_id: PoolId,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ReplicaRecord {
    pub fn new(pool_id: impl Into<PoolId>) -> Self {
        Self {
            pool_id: pool_id.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Frozen replica index.
///
/// Selectors are evaluated locally and not by the API server, which accepts
/// a slightly different grammar:
/// - a value may contain `=` here (`key=vol=A`) but the API server rejects
///   such a selector;
/// - set-based terms (`key in (a,b)`) are rejected here with
///   [`Error::InvalidSelector`] but the API server accepts them.
///
/// The anti-affinity labels produced by templates use neither form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaSnapshot {
    replicas: Vec<ReplicaRecord>,
    taken_at: DateTime<Utc>,
}

impl ReplicaSnapshot {
    pub fn new(replicas: Vec<ReplicaRecord>) -> Self {
        Self {
            replicas,
            taken_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Pools hosting a replica that matches `selector`, one entry per replica
    pub fn matching_pools(&self, selector: &LabelSelector) -> Result<Vec<PoolId>> {
        let requirements = parse_selector(selector.as_str())?;
        Ok(self
            .replicas
            .iter()
            .filter(|r| requirements.iter().all(|req| req.matches(&r.labels)))
            .map(|r| r.pool_id.clone())
            .collect())
    }
}

#[async_trait]
impl ReplicaIndex for ReplicaSnapshot {
    async fn replicas_by_label(&self, selector: &LabelSelector) -> Result<Vec<PoolId>> {
        self.matching_pools(selector)
    }
}

// =============================================================================
// Selector Evaluation
// =============================================================================

/// One term of an equality-based label selector
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::NotExists(k) => !labels.contains_key(k),
        }
    }
}

/// Parse `k=v,k2!=v2,k3,!k4`. The first `=` of a term separates key from
/// value, so values may themselves contain `=`.
fn parse_selector(selector: &str) -> Result<Vec<Requirement>> {
    let invalid = |reason: &str| Error::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    let mut requirements = Vec::new();
    for term in selector.split(',').map(str::trim) {
        if term.is_empty() {
            continue;
        }
        if term.contains('(') {
            return Err(invalid("set-based requirements are not supported"));
        }

        let requirement = match term.find('=') {
            Some(i) if term[..i].ends_with('!') => Requirement::NotEquals(
                term[..i - 1].trim().to_string(),
                term[i + 1..].trim().to_string(),
            ),
            Some(i) => {
                let value = term[i + 1..].strip_prefix('=').unwrap_or(&term[i + 1..]);
                Requirement::Equals(term[..i].trim().to_string(), value.trim().to_string())
            }
            None => match term.strip_prefix('!') {
                Some(key) => Requirement::NotExists(key.trim().to_string()),
                None => Requirement::Exists(term.to_string()),
            },
        };

        let key = match &requirement {
            Requirement::Equals(k, _)
            | Requirement::NotEquals(k, _)
            | Requirement::Exists(k)
            | Requirement::NotExists(k) => k,
        };
        if key.is_empty() {
            return Err(invalid("empty label key"));
        }
        requirements.push(requirement);
    }

    Ok(requirements)
}

// =============================================================================
// Static Pool Hosts
// =============================================================================

/// Fixed host to pool assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPoolHosts {
    hosts: BTreeMap<String, Vec<PoolId>>,
}

impl StaticPoolHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: impl Into<String>, pool_id: impl Into<PoolId>) {
        self.hosts.entry(host.into()).or_default().push(pool_id.into());
    }
}

#[async_trait]
impl PoolHostIndex for StaticPoolHosts {
    async fn pools_on_host(&self, host: &str) -> Result<Vec<PoolId>> {
        Ok(self.hosts.get(host).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ANTI_AFFINITY_KEY: &str = "openebs.io/replica-anti-affinity";

    fn snapshot() -> ReplicaSnapshot {
        ReplicaSnapshot::new(vec![
            ReplicaRecord::new("p1")
                .with_label(ANTI_AFFINITY_KEY, "vol=A")
                .with_label("app", "db"),
            ReplicaRecord::new("p2").with_label(ANTI_AFFINITY_KEY, "vol=B"),
            ReplicaRecord::new("p3")
                .with_label(ANTI_AFFINITY_KEY, "vol=A")
                .with_label("app", "web"),
            ReplicaRecord::new("p3").with_label("app", "web"),
        ])
    }

    fn ids(v: &[&str]) -> Vec<PoolId> {
        v.iter().map(|s| PoolId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_value_may_contain_equals() {
        let out = snapshot()
            .replicas_by_label(&"openebs.io/replica-anti-affinity=vol=A".into())
            .await
            .unwrap();
        assert_eq!(out, ids(&["p1", "p3"]));
    }

    #[test]
    fn test_selector_operators() {
        let snap = snapshot();
        let run = |s: &str| snap.matching_pools(&LabelSelector::from(s)).unwrap();

        assert_eq!(run("app==web"), ids(&["p3", "p3"]));
        assert_eq!(run("app!=web"), ids(&["p1", "p2"]));
        assert_eq!(run("app"), ids(&["p1", "p3", "p3"]));
        assert_eq!(run("!app"), ids(&["p2"]));
        assert_eq!(run("app=web, openebs.io/replica-anti-affinity=vol=A"), ids(&["p3"]));
        assert!(run("app=cache").is_empty());
    }

    #[test]
    fn test_set_based_selector_rejected() {
        let err = snapshot()
            .matching_pools(&LabelSelector::from("app in (web,db)"))
            .unwrap_err();
        assert_matches!(err, Error::InvalidSelector { .. });

        let err = snapshot()
            .matching_pools(&LabelSelector::from("=web"))
            .unwrap_err();
        assert_matches!(err, Error::InvalidSelector { .. });
    }

    #[tokio::test]
    async fn test_static_pool_hosts() {
        let mut hosts = StaticPoolHosts::new();
        hosts.insert("node-1", "p1");
        hosts.insert("node-1", "p4");
        hosts.insert("node-2", "p2");

        assert_eq!(hosts.pools_on_host("node-1").await.unwrap(), ids(&["p1", "p4"]));
        assert!(hosts.pools_on_host("node-3").await.unwrap().is_empty());
    }
}
