//! Test doubles for the cluster index ports

use crate::domain::ports::{LabelSelector, PoolHostIndex, PoolId, ReplicaIndex, ReplicaIndexRef};
use crate::error::{Error, Result};
use crate::index::snapshot::ReplicaSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn pools(ids: &[&str]) -> Vec<PoolId> {
    ids.iter().map(|id| PoolId::from(*id)).collect()
}

/// Replica index answering from canned responses and counting queries
#[derive(Debug, Default)]
pub(crate) struct MockReplicaIndex {
    responses: HashMap<String, Vec<PoolId>>,
    fail: bool,
    stall: bool,
    frozen: Option<Arc<ReplicaSnapshot>>,
    calls: AtomicUsize,
    freezes: AtomicUsize,
}

impl MockReplicaIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every query hangs for an hour
    pub(crate) fn stalling() -> Self {
        Self {
            stall: true,
            ..Default::default()
        }
    }

    pub(crate) fn with(mut self, selector: &str, hosting: &[&str]) -> Self {
        self.responses.insert(selector.to_string(), pools(hosting));
        self
    }

    /// Answer `freeze` with `snapshot`
    pub(crate) fn with_frozen(mut self, snapshot: ReplicaSnapshot) -> Self {
        self.frozen = Some(Arc::new(snapshot));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn freezes(&self) -> usize {
        self.freezes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplicaIndex for MockReplicaIndex {
    async fn replicas_by_label(&self, selector: &LabelSelector) -> Result<Vec<PoolId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail {
            return Err(Error::ReplicaIndex("fake error".into()));
        }
        Ok(self
            .responses
            .get(selector.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn freeze(&self) -> Result<Option<ReplicaIndexRef>> {
        self.freezes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .frozen
            .clone()
            .map(|snapshot| snapshot as ReplicaIndexRef))
    }
}

/// Pool host index answering from canned responses and counting queries
#[derive(Debug, Default)]
pub(crate) struct MockPoolHostIndex {
    hosts: HashMap<String, Vec<PoolId>>,
    calls: AtomicUsize,
}

impl MockPoolHostIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, host: &str, pool_ids: &[&str]) -> Self {
        self.hosts.insert(host.to_string(), pools(pool_ids));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolHostIndex for MockPoolHostIndex {
    async fn pools_on_host(&self, host: &str) -> Result<Vec<PoolId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hosts.get(host).cloned().unwrap_or_default())
    }
}
