//! REST API Handlers
//!
//! Lets an external template evaluator call the selection functions by name
//! over HTTP.

use crate::domain::ports::PoolId;
use crate::error::{Error, Result};
use crate::metrics::{SelectorMetrics, OUTCOME_FAILED, OUTCOME_OK, OUTCOME_REJECTED};
use crate::template::{self, TemplateFunctions, CSP_FILTER};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Call a template function by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionRequest {
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Result of a template function call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionResponse {
    pub result: Value,
}

/// Registered template function names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionListResponse {
    pub functions: Vec<String>,
}

/// Select pools for a set of authoring labels in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPoolsRequest {
    pub candidates: Vec<PoolId>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Pools that survived every policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPoolsResponse {
    pub selected: Vec<PoolId>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// =============================================================================
// REST Router
// =============================================================================

/// Settings that shape request handling
#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Upper bound for one call
    pub request_timeout: Duration,
    /// Freeze the replica index once per request
    pub frozen_snapshot: bool,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            frozen_snapshot: false,
        }
    }
}

/// REST API router builder
pub struct RestRouter {
    functions: TemplateFunctions,
    settings: RestSettings,
    metrics: Option<Arc<SelectorMetrics>>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(functions: TemplateFunctions, settings: RestSettings) -> Self {
        Self {
            functions,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SelectorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            functions: self.functions,
            settings: self.settings,
            metrics: self.metrics,
        };

        Router::new()
            .route("/v1/functions", get(list_functions))
            .route("/v1/functions/:name", post(call_function))
            .route("/v1/select", post(select_pools))
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    functions: TemplateFunctions,
    settings: RestSettings,
    metrics: Option<Arc<SelectorMetrics>>,
}

impl AppState {
    /// Functions bound to the view this request should read
    async fn request_functions(&self) -> Result<TemplateFunctions> {
        if !self.settings.frozen_snapshot {
            return Ok(self.functions.clone());
        }
        let view = self.functions.view().frozen().await?;
        Ok(TemplateFunctions::new(view))
    }

    /// Run `call` under the request timeout and record its outcome
    async fn run<T, F, Fut>(&self, function: &str, call: F) -> Result<T>
    where
        F: FnOnce(TemplateFunctions) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let timeout = self.settings.request_timeout;

        let result = match tokio::time::timeout(timeout, async {
            let functions = self.request_functions().await?;
            call(functions).await
        })
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => OUTCOME_OK,
                Err(e) if e.is_retryable() => OUTCOME_FAILED,
                Err(_) => OUTCOME_REJECTED,
            };
            metrics.observe(function, outcome, started.elapsed());
        }
        result
    }

    fn observe_selected(&self, function: &str, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_selected(function, count);
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List registered template functions
async fn list_functions() -> impl IntoResponse {
    Json(FunctionListResponse {
        functions: TemplateFunctions::names()
            .iter()
            .map(|name| name.to_string())
            .collect(),
    })
}

/// Call a template function by name
async fn call_function(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<CallFunctionRequest>,
) -> Response {
    debug!("Template call {} with {} args", name, request.args.len());

    let args = request.args;
    let function = name.clone();
    let label = if TemplateFunctions::names().contains(&name.as_str()) {
        name.as_str()
    } else {
        "unknown"
    };
    let result = state
        .run(label, |functions| async move { functions.call(&function, args).await })
        .await;

    match result {
        Ok(result) => {
            if let Some(selected) = result.as_array().filter(|_| name == CSP_FILTER) {
                state.observe_selected(CSP_FILTER, selected.len());
            }
            (StatusCode::OK, Json(CallFunctionResponse { result })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Build policies from labels and filter candidates in one call
async fn select_pools(
    State(state): State<AppState>,
    Json(request): Json<SelectPoolsRequest>,
) -> Response {
    debug!(
        "Selecting from {} candidates with {} labels",
        request.candidates.len(),
        request.labels.len()
    );

    let SelectPoolsRequest { candidates, labels } = request;
    let result = state
        .run(CSP_FILTER, |functions| async move {
            let options = template::csp_get_policy_by_label_selector(&labels);
            functions.csp_filter(candidates, options).await
        })
        .await;

    match result {
        Ok(selected) => {
            state.observe_selected(CSP_FILTER, selected.len());
            (StatusCode::OK, Json(SelectPoolsResponse { selected })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check
async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, "ready")
}

// =============================================================================
// Error Mapping
// =============================================================================

fn error_response(e: &Error) -> Response {
    let (status, code) = match e.root() {
        Error::IncompatiblePolicies => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_selection"),
        Error::UnknownTemplateFunction { .. } => (StatusCode::NOT_FOUND, "unknown_function"),
        Error::TemplateArgument { .. } | Error::JsonParse(_) => {
            (StatusCode::BAD_REQUEST, "invalid_arguments")
        }
        Error::InvalidSelector { .. } => (StatusCode::BAD_REQUEST, "invalid_selector"),
        Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        Error::Kube(_) | Error::ReplicaIndex(_) | Error::PoolHostIndex(_) => {
            (StatusCode::BAD_GATEWAY, "index_unavailable")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status.is_server_error() {
        warn!("Template call failed: {}", e);
    }

    (
        status,
        Json(ApiErrorResponse {
            error: code.into(),
            message: e.to_string(),
            details: None,
        }),
    )
        .into_response()
}
