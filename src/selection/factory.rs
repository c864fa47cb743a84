//! Policy Factory
//!
//! Turns authoring-side label strings into selection options.

use super::engine::PolicyOption;
use super::policy::Policy;

/// Label token requesting preferred (best effort) replica anti-affinity
pub const PREFERRED_REPLICA_ANTI_AFFINITY_LABEL: &str = "openebs.io/preferred-replica-anti-affinity";

/// Label token requesting strict replica anti-affinity
pub const REPLICA_ANTI_AFFINITY_LABEL: &str = "openebs.io/replica-anti-affinity";

/// Annotation token naming the host a replica should be scheduled on
pub const SCHEDULE_ON_HOST_ANNOTATION: &str = "volume.kubernetes.io/selected-node";

/// Map one label string to the option it requests, if any.
///
/// Tokens are tested host first, then preferred, then strict. A label
/// carrying several tokens maps to the first one in that order.
pub fn policy_from_label(label: &str) -> Option<PolicyOption> {
    if label.contains(SCHEDULE_ON_HOST_ANNOTATION) {
        Some(prefer_schedule_on_host(label))
    } else if label.contains(PREFERRED_REPLICA_ANTI_AFFINITY_LABEL) {
        Some(Policy::prefer_anti_affinity(label).into())
    } else if label.contains(REPLICA_ANTI_AFFINITY_LABEL) {
        Some(Policy::anti_affinity(label).into())
    } else {
        None
    }
}

/// Options for every recognised label, in input order
pub fn policies_from_labels<S: AsRef<str>>(labels: &[S]) -> Vec<PolicyOption> {
    labels
        .iter()
        .filter_map(|label| policy_from_label(label.as_ref()))
        .collect()
}

/// Preferred host scheduling from `volume.kubernetes.io/selected-node=<host>`
/// or a bare host name
pub fn prefer_schedule_on_host(annotation: &str) -> PolicyOption {
    let prefix = format!("{}=", SCHEDULE_ON_HOST_ANNOTATION);
    let host = annotation.strip_prefix(&prefix).unwrap_or(annotation);
    Policy::prefer_schedule_on_host(host).into()
}
