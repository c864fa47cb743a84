//! Selection Engine
//!
//! A [`Selection`] pairs the candidate pools of one placement request with
//! the policies that narrow them, and runs the policies as a chain.

use super::policy::{Policy, PolicyName};
use crate::domain::ports::{ClusterView, PoolId};
use crate::error::{Error, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::debug;

// =============================================================================
// Policy Option
// =============================================================================

/// A build option for a [`Selection`].
///
/// Options whose `policy` tag is missing or unknown are carried through and
/// ignored, so newer templates keep working against older selectors. An
/// option naming a known policy must be well formed or deserialization fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PolicyOption {
    Policy(Policy),
    Unrecognised(serde_json::Value),
}

impl<'de> Deserialize<'de> for PolicyOption {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let known = raw
            .get("policy")
            .and_then(serde_json::Value::as_str)
            .and_then(PolicyName::from_name);

        match known {
            Some(name) => serde_json::from_value(raw)
                .map(PolicyOption::Policy)
                .map_err(|e| de::Error::custom(format!("malformed {} policy: {}", name, e))),
            None => Ok(PolicyOption::Unrecognised(raw)),
        }
    }
}

impl PolicyOption {
    /// Policies this option contributes
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        match self {
            PolicyOption::Policy(policy) => Some(policy),
            PolicyOption::Unrecognised(_) => None,
        }
        .into_iter()
    }
}

impl From<Policy> for PolicyOption {
    fn from(policy: Policy) -> Self {
        PolicyOption::Policy(policy)
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Candidate pools of one placement request and the policies to apply
#[derive(Debug, Clone)]
pub struct Selection {
    /// Pools the selection starts from
    candidates: Vec<PoolId>,
    /// Policies in registration order
    policies: Vec<Policy>,
}

impl Selection {
    /// Build a selection; policies keep the order of `options`
    pub fn new<I>(candidates: Vec<PoolId>, options: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PolicyOption>,
    {
        let mut policies = Vec::new();
        for option in options {
            let option = option.into();
            if let PolicyOption::Unrecognised(raw) = &option {
                debug!("Ignoring unrecognised selection option: {}", raw);
            }
            policies.extend(option.policies().cloned());
        }

        Self {
            candidates,
            policies,
        }
    }

    pub fn candidates(&self) -> &[PoolId] {
        &self.candidates
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Whether a policy with this name is registered
    pub fn has_policy(&self, name: PolicyName) -> bool {
        self.policies.iter().any(|p| p.name() == name)
    }

    /// Reject policy combinations that contradict each other
    pub fn validate(&self) -> Result<()> {
        if self.has_policy(PolicyName::AntiAffinityLabel)
            && self.has_policy(PolicyName::PreferAntiAffinityLabel)
        {
            return Err(Error::IncompatiblePolicies);
        }
        Ok(())
    }

    /// Run every policy in registration order, each one narrowing the
    /// output of the previous one.
    ///
    /// Validation runs first, so an invalid selection never reaches the
    /// cluster view. The first policy error aborts the chain.
    pub async fn filter(&self, view: &ClusterView) -> Result<Vec<PoolId>> {
        self.validate()?;

        if self.policies.is_empty() {
            return Ok(self.candidates.clone());
        }

        let mut filtered = self.candidates.clone();
        for policy in &self.policies {
            filtered = policy.filter(&filtered, view).await?;
        }

        debug!(
            "Selected {} of {} candidate pools using {} policies",
            filtered.len(),
            self.candidates.len(),
            self.policies.len()
        );
        Ok(filtered)
    }
}

/// Build, validate and run a selection in one step
pub async fn filter_pool_ids<I>(
    candidates: Vec<PoolId>,
    options: I,
    view: &ClusterView,
) -> Result<Vec<PoolId>>
where
    I: IntoIterator,
    I::Item: Into<PolicyOption>,
{
    Selection::new(candidates, options).filter(view).await
}
