//! Template Functions
//!
//! Exposes the selection engine to provisioning templates. Each function is
//! registered under a fixed name that templates call; the names are part of
//! the wire contract and must not change.
//!
//! Arguments and results travel as JSON values so any template evaluator can
//! drive the engine without the engine depending on it.

use crate::domain::ports::{ClusterView, PoolId};
use crate::error::{Error, Result};
use crate::selection::{self, Policy, PolicyOption};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Policy options for a list of label strings
pub const CSP_GET_POLICY_BY_LABEL_SELECTOR: &str = "cspGetPolicyByLabelSelector";
/// Filter candidate pool ids through policy options
pub const CSP_FILTER: &str = "cspFilter";
/// Strict anti-affinity option from a label
pub const CSP_ANTI_AFFINITY: &str = "cspAntiAffinity";
/// Preferred anti-affinity option from a label
pub const CSP_PREFER_ANTI_AFFINITY: &str = "cspPreferAntiAffinity";
/// Preferred host scheduling option from a host annotation
pub const PREFER_SCHEDULE_ON_HOST: &str = "preferScheduleOnHost";

/// Every registered function name
pub const FUNCTION_NAMES: [&str; 5] = [
    CSP_GET_POLICY_BY_LABEL_SELECTOR,
    CSP_FILTER,
    CSP_ANTI_AFFINITY,
    CSP_PREFER_ANTI_AFFINITY,
    PREFER_SCHEDULE_ON_HOST,
];

// =============================================================================
// Typed Functions
// =============================================================================

/// `cspGetPolicyByLabelSelector`
pub fn csp_get_policy_by_label_selector<S: AsRef<str>>(labels: &[S]) -> Vec<PolicyOption> {
    selection::policies_from_labels(labels)
}

/// `cspAntiAffinity`
pub fn csp_anti_affinity(label: &str) -> PolicyOption {
    Policy::anti_affinity(label).into()
}

/// `cspPreferAntiAffinity`
pub fn csp_prefer_anti_affinity(label: &str) -> PolicyOption {
    Policy::prefer_anti_affinity(label).into()
}

/// `preferScheduleOnHost`
pub fn prefer_schedule_on_host(annotation: &str) -> PolicyOption {
    selection::prefer_schedule_on_host(annotation)
}

// =============================================================================
// Function Registry
// =============================================================================

/// Name-addressable template functions bound to a cluster view
#[derive(Debug, Clone)]
pub struct TemplateFunctions {
    view: ClusterView,
}

impl TemplateFunctions {
    pub fn new(view: ClusterView) -> Self {
        Self { view }
    }

    pub fn names() -> &'static [&'static str] {
        &FUNCTION_NAMES
    }

    pub fn view(&self) -> &ClusterView {
        &self.view
    }

    /// `cspFilter`: validate the options and narrow `candidates`
    pub async fn csp_filter(
        &self,
        candidates: Vec<PoolId>,
        options: Vec<PolicyOption>,
    ) -> Result<Vec<PoolId>> {
        selection::filter_pool_ids(candidates, options, &self.view).await
    }

    /// Call a function by its template name.
    ///
    /// Label functions accept strings or arrays of strings, flattened in
    /// order. `cspFilter` takes `[candidates, options]`.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        debug!("Calling template function {} with {} args", name, args.len());

        let result = match name {
            CSP_GET_POLICY_BY_LABEL_SELECTOR => {
                let labels = string_args(name, args)?;
                to_value(csp_get_policy_by_label_selector(&labels))?
            }
            CSP_FILTER => {
                let [candidates, options] = exact_args::<2>(name, args)?;
                let candidates: Vec<PoolId> = typed_arg(name, "candidates", candidates)?;
                let options: Vec<PolicyOption> = typed_arg(name, "options", options)?;
                to_value(self.csp_filter(candidates, options).await?)?
            }
            CSP_ANTI_AFFINITY => to_value(csp_anti_affinity(&single_string(name, args)?))?,
            CSP_PREFER_ANTI_AFFINITY => {
                to_value(csp_prefer_anti_affinity(&single_string(name, args)?))?
            }
            PREFER_SCHEDULE_ON_HOST => {
                to_value(prefer_schedule_on_host(&single_string(name, args)?))?
            }
            _ => {
                return Err(Error::UnknownTemplateFunction {
                    name: name.to_string(),
                })
            }
        };

        Ok(result)
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

fn argument_error(function: &str, reason: impl Into<String>) -> Error {
    Error::TemplateArgument {
        function: function.to_string(),
        reason: reason.into(),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn exact_args<const N: usize>(function: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let given = args.len();
    args.try_into()
        .map_err(|_| argument_error(function, format!("expected {} arguments, got {}", N, given)))
}

fn typed_arg<T: DeserializeOwned>(function: &str, arg: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| argument_error(function, format!("{}: {}", arg, e)))
}

fn single_string(function: &str, args: Vec<Value>) -> Result<String> {
    let [value] = exact_args::<1>(function, args)?;
    match value {
        Value::String(s) => Ok(s),
        other => Err(argument_error(function, format!("expected a string, got {}", other))),
    }
}

fn string_args(function: &str, args: Vec<Value>) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    for arg in args {
        match arg {
            Value::String(s) => labels.push(s),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => labels.push(s),
                        other => {
                            return Err(argument_error(
                                function,
                                format!("expected a string, got {}", other),
                            ))
                        }
                    }
                }
            }
            other => {
                return Err(argument_error(
                    function,
                    format!("expected a string or list of strings, got {}", other),
                ))
            }
        }
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::mock::{pools, MockReplicaIndex};
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    const ANTI: &str = "openebs.io/replica-anti-affinity=vol=A";
    const PREFER: &str = "openebs.io/preferred-replica-anti-affinity=vol=A";

    fn functions(index: MockReplicaIndex) -> (TemplateFunctions, Arc<MockReplicaIndex>) {
        let index = Arc::new(index);
        (TemplateFunctions::new(ClusterView::new(index.clone())), index)
    }

    #[test]
    fn test_function_names_are_stable() {
        assert_eq!(
            TemplateFunctions::names(),
            &[
                "cspGetPolicyByLabelSelector",
                "cspFilter",
                "cspAntiAffinity",
                "cspPreferAntiAffinity",
                "preferScheduleOnHost",
            ]
        );
    }

    #[test]
    fn test_direct_constructors() {
        assert_eq!(
            csp_anti_affinity(ANTI),
            PolicyOption::Policy(Policy::anti_affinity(ANTI))
        );
        assert_eq!(
            csp_prefer_anti_affinity(PREFER),
            PolicyOption::Policy(Policy::prefer_anti_affinity(PREFER))
        );
    }

    #[tokio::test]
    async fn test_get_policies_then_filter_by_name() {
        let (funcs, index) = functions(MockReplicaIndex::new().with(ANTI, &["p2"]));

        let options = funcs
            .call(CSP_GET_POLICY_BY_LABEL_SELECTOR, vec![json!(ANTI), json!("app=db")])
            .await
            .unwrap();
        assert_eq!(
            options,
            json!([{"policy": "anti-affinity-label", "selector": ANTI}])
        );

        let selected = funcs
            .call(CSP_FILTER, vec![json!(["p1", "p2", "p3"]), options])
            .await
            .unwrap();
        assert_eq!(selected, json!(["p1", "p3"]));
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_label_arguments_flatten_lists() {
        let (funcs, _) = functions(MockReplicaIndex::new());
        let options = funcs
            .call(
                CSP_GET_POLICY_BY_LABEL_SELECTOR,
                vec![json!([ANTI, ""]), json!("volume.kubernetes.io/selected-node=node-1")],
            )
            .await
            .unwrap();

        assert_eq!(
            options,
            json!([
                {"policy": "anti-affinity-label", "selector": ANTI},
                {"policy": "prefer-schedule-on-host", "host": "node-1"}
            ])
        );
    }

    #[tokio::test]
    async fn test_filter_rejects_mixed_anti_affinity() {
        let (funcs, index) = functions(MockReplicaIndex::new());
        let options = vec![csp_anti_affinity(ANTI), csp_prefer_anti_affinity(PREFER)];

        let err = funcs
            .csp_filter(pools(&["p1", "p2", "p3"]), options)
            .await
            .unwrap_err();
        assert_matches!(err, Error::IncompatiblePolicies);
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test]
    async fn test_filter_preferred_fallback() {
        let (funcs, _) = functions(MockReplicaIndex::new().with(PREFER, &["p1", "p2"]));
        let out = funcs
            .csp_filter(pools(&["p1", "p2"]), vec![csp_prefer_anti_affinity(PREFER)])
            .await
            .unwrap();

        assert_eq!(out, pools(&["p1", "p2"]));
    }

    #[tokio::test]
    async fn test_single_label_functions_by_name() {
        let (funcs, _) = functions(MockReplicaIndex::new());

        let anti = funcs.call(CSP_ANTI_AFFINITY, vec![json!(ANTI)]).await.unwrap();
        assert_eq!(anti, json!({"policy": "anti-affinity-label", "selector": ANTI}));

        let host = funcs
            .call(PREFER_SCHEDULE_ON_HOST, vec![json!("volume.kubernetes.io/selected-node=node-7")])
            .await
            .unwrap();
        assert_eq!(host, json!({"policy": "prefer-schedule-on-host", "host": "node-7"}));
    }

    #[tokio::test]
    async fn test_filter_rejects_malformed_hard_policy() {
        let (funcs, index) = functions(MockReplicaIndex::new().with("vol=a", &["p1"]));
        let err = funcs
            .call(
                CSP_FILTER,
                vec![
                    json!(["p1", "p2"]),
                    json!([{"policy": "anti-affinity-label", "selector": ["vol=a"]}]),
                ],
            )
            .await
            .unwrap_err();

        assert_matches!(err, Error::TemplateArgument { .. });
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_calls() {
        let (funcs, _) = functions(MockReplicaIndex::new());

        let err = funcs.call("cspGetPolicies", vec![]).await.unwrap_err();
        assert_matches!(err, Error::UnknownTemplateFunction { .. });

        let err = funcs.call(CSP_ANTI_AFFINITY, vec![]).await.unwrap_err();
        assert_matches!(err, Error::TemplateArgument { .. });

        let err = funcs.call(CSP_ANTI_AFFINITY, vec![json!(3)]).await.unwrap_err();
        assert_matches!(err, Error::TemplateArgument { .. });

        let err = funcs
            .call(CSP_FILTER, vec![json!("p1"), json!([])])
            .await
            .unwrap_err();
        assert_matches!(err, Error::TemplateArgument { .. });

        let err = funcs
            .call(CSP_GET_POLICY_BY_LABEL_SELECTOR, vec![json!({"a": 1})])
            .await
            .unwrap_err();
        assert_matches!(err, Error::TemplateArgument { .. });
    }
}
