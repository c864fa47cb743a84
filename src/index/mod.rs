//! Index Module
//!
//! Implementations of the cluster index ports: Kubernetes-backed views
//! over cStor resources and frozen in-memory snapshots.

pub mod kubernetes;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod mock;

pub use kubernetes::*;
pub use snapshot::*;
