//! Selection Policies
//!
//! Each policy narrows a list of candidate pools. Policies only ever drop
//! candidates: the output is always a subsequence of the input.

use crate::domain::ports::{ClusterView, LabelSelector, PoolId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// =============================================================================
// Policy Name
// =============================================================================

/// Stable names reported by [`Policy::name`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyName {
    AntiAffinityLabel,
    PreferAntiAffinityLabel,
    ScheduleOnHost,
    PreferScheduleOnHost,
}

impl PolicyName {
    pub const ALL: [PolicyName; 4] = [
        PolicyName::AntiAffinityLabel,
        PolicyName::PreferAntiAffinityLabel,
        PolicyName::ScheduleOnHost,
        PolicyName::PreferScheduleOnHost,
    ];

    /// Look up a policy by its stable name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyName::AntiAffinityLabel => "anti-affinity-label",
            PolicyName::PreferAntiAffinityLabel => "prefer-anti-affinity-label",
            PolicyName::ScheduleOnHost => "schedule-on-host",
            PolicyName::PreferScheduleOnHost => "prefer-schedule-on-host",
        }
    }
}

impl std::fmt::Display for PolicyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Policy
// =============================================================================

/// A pool selection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum Policy {
    /// Exclude every pool already hosting a replica matching the selector
    #[serde(rename = "anti-affinity-label")]
    AntiAffinity { selector: LabelSelector },

    /// Like [`Policy::AntiAffinity`], but keeps all candidates when the
    /// exclusion would leave none
    #[serde(rename = "prefer-anti-affinity-label")]
    PreferAntiAffinity { selector: LabelSelector },

    /// Keep only pools scheduled on the host
    ScheduleOnHost { host: String },

    /// Like [`Policy::ScheduleOnHost`], but keeps all candidates when the
    /// host has none of them
    PreferScheduleOnHost { host: String },
}

impl Policy {
    pub fn anti_affinity(selector: impl Into<LabelSelector>) -> Self {
        Policy::AntiAffinity {
            selector: selector.into(),
        }
    }

    pub fn prefer_anti_affinity(selector: impl Into<LabelSelector>) -> Self {
        Policy::PreferAntiAffinity {
            selector: selector.into(),
        }
    }

    pub fn schedule_on_host(host: impl Into<String>) -> Self {
        Policy::ScheduleOnHost { host: host.into() }
    }

    pub fn prefer_schedule_on_host(host: impl Into<String>) -> Self {
        Policy::PreferScheduleOnHost { host: host.into() }
    }

    /// Name of this policy
    pub fn name(&self) -> PolicyName {
        match self {
            Policy::AntiAffinity { .. } => PolicyName::AntiAffinityLabel,
            Policy::PreferAntiAffinity { .. } => PolicyName::PreferAntiAffinityLabel,
            Policy::ScheduleOnHost { .. } => PolicyName::ScheduleOnHost,
            Policy::PreferScheduleOnHost { .. } => PolicyName::PreferScheduleOnHost,
        }
    }

    /// Narrow `candidates` according to this policy.
    ///
    /// Errors from the cluster view are returned prefixed with the policy
    /// name; no partial result is ever returned alongside an error.
    pub async fn filter(&self, candidates: &[PoolId], view: &ClusterView) -> Result<Vec<PoolId>> {
        let filtered = match self {
            Policy::AntiAffinity { selector } => anti_affinity(selector, candidates, view).await,
            Policy::PreferAntiAffinity { selector } => {
                anti_affinity(selector, candidates, view)
                    .await
                    .map(|kept| prefer(kept, candidates))
            }
            Policy::ScheduleOnHost { host } => schedule_on_host(host, candidates, view).await,
            Policy::PreferScheduleOnHost { host } => {
                schedule_on_host(host, candidates, view)
                    .await
                    .map(|kept| prefer(kept, candidates))
            }
        };

        let filtered = filtered.map_err(|e| Error::in_policy(self.name(), e))?;
        debug!(
            "Policy {} kept {} of {} candidate pools",
            self.name(),
            filtered.len(),
            candidates.len()
        );
        Ok(filtered)
    }
}

/// Hard anti-affinity: drop every candidate that hosts a matching replica
async fn anti_affinity(
    selector: &LabelSelector,
    candidates: &[PoolId],
    view: &ClusterView,
) -> Result<Vec<PoolId>> {
    if selector.is_empty() || candidates.is_empty() {
        return Ok(candidates.to_vec());
    }

    let hosting = view.replicas().replicas_by_label(selector).await?;
    let exclude: HashSet<&PoolId> = hosting.iter().collect();

    Ok(candidates
        .iter()
        .filter(|pool| !exclude.contains(pool))
        .cloned()
        .collect())
}

/// Hard host pinning: keep only candidates scheduled on `host`
async fn schedule_on_host(
    host: &str,
    candidates: &[PoolId],
    view: &ClusterView,
) -> Result<Vec<PoolId>> {
    if host.is_empty() || candidates.is_empty() {
        return Ok(candidates.to_vec());
    }

    let hosts = view.hosts().ok_or_else(|| {
        Error::Configuration("no pool host index configured".into())
    })?;
    let on_host = hosts.pools_on_host(host).await?;
    let keep: HashSet<&PoolId> = on_host.iter().collect();

    Ok(candidates
        .iter()
        .filter(|pool| keep.contains(pool))
        .cloned()
        .collect())
}

/// Soft fallback: an empty result means the rule could not be met
fn prefer(kept: Vec<PoolId>, candidates: &[PoolId]) -> Vec<PoolId> {
    if kept.is_empty() {
        candidates.to_vec()
    } else {
        kept
    }
}
