//! Selector Metrics
//!
//! Prometheus collectors for template calls served by the API.

use crate::error::{Error, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

/// Outcome label values
pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_FAILED: &str = "failed";

/// Collectors for template calls
#[derive(Clone)]
pub struct SelectorMetrics {
    /// Calls by function and outcome
    pub calls: IntCounterVec,
    /// Call latency by function
    pub duration: HistogramVec,
    /// Pools returned by successful filter calls
    pub selected_pools: HistogramVec,
}

impl SelectorMetrics {
    /// Create unregistered collectors
    pub fn new() -> Result<Self> {
        let calls = IntCounterVec::new(
            Opts::new(
                "cstor_pool_selector_calls_total",
                "Template function calls by outcome",
            ),
            &["function", "outcome"],
        )
        .map_err(metrics_error)?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "cstor_pool_selector_call_duration_seconds",
                "Duration of template function calls",
            ),
            &["function"],
        )
        .map_err(metrics_error)?;

        let selected_pools = HistogramVec::new(
            HistogramOpts::new(
                "cstor_pool_selector_selected_pools",
                "Number of pools returned by a selection",
            )
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
            &["function"],
        )
        .map_err(metrics_error)?;

        Ok(Self {
            calls,
            duration,
            selected_pools,
        })
    }

    /// Register all collectors with `registry`
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.calls.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.duration.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(self.selected_pools.clone()))
            .map_err(metrics_error)?;
        Ok(())
    }

    /// Record one call
    pub fn observe(&self, function: &str, outcome: &str, elapsed: Duration) {
        self.calls.with_label_values(&[function, outcome]).inc();
        self.duration
            .with_label_values(&[function])
            .observe(elapsed.as_secs_f64());
    }

    /// Record the size of a selection result
    pub fn observe_selected(&self, function: &str, count: usize) {
        self.selected_pools
            .with_label_values(&[function])
            .observe(count as f64);
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics registration failed: {}", e))
}
