//! cStor Pool Selector
//!
//! Serves the pool selection template functions over REST, backed by the
//! cStor resources of the cluster it runs in.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cstor_pool_selector::{
    ApiServer, ApiServerConfig, ClusterView, Error, KubePoolHostIndex, KubeReplicaIndex, Result,
    SelectorMetrics, ServerConfig, TemplateFunctions,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// cStor Pool Selector - replica placement policies for cStor volumes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// REST API bind address
    #[arg(long, env = "API_ADDR")]
    api_addr: Option<SocketAddr>,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR")]
    health_addr: Option<SocketAddr>,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Namespace holding CStorVolumeReplica objects (all namespaces if unset)
    #[arg(long, env = "REPLICA_NAMESPACE")]
    replica_namespace: Option<String>,

    /// Materialise the replica index once per request
    #[arg(long, env = "FROZEN_SNAPSHOT")]
    frozen_snapshot: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// File configuration with flags and environment applied on top
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config_file {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(addr) = self.api_addr {
            config.api_addr = addr;
        }
        if let Some(addr) = self.health_addr {
            config.health_addr = addr;
        }
        if let Some(addr) = self.metrics_addr {
            config.metrics_addr = addr;
        }
        if let Some(ns) = &self.replica_namespace {
            config.index.replica_namespace = Some(ns.clone());
        }
        config.frozen_snapshot |= self.frozen_snapshot;

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let config = args.server_config()?;

    info!("Starting cStor Pool Selector");
    info!("  Version: {}", cstor_pool_selector::VERSION);
    info!("  REST API: {}", config.api_addr);
    info!(
        "  Replica namespace: {}",
        config.index.replica_namespace.as_deref().unwrap_or("<all>")
    );

    let client = kube::Client::try_default().await?;
    info!("Kubernetes client initialized");

    let replicas = KubeReplicaIndex::new(client.clone(), config.index.clone());
    let hosts = KubePoolHostIndex::new(client, config.index.clone());
    let view = ClusterView::new(Arc::new(replicas)).with_hosts(Arc::new(hosts));

    let metrics = Arc::new(SelectorMetrics::new()?);
    metrics.register(prometheus::default_registry())?;

    // Start health server
    let health_addr = config.health_addr;
    tokio::spawn(async move {
        if let Err(e) = run_health_server(health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = config.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_addr).await {
            error!("Metrics server error: {}", e);
        }
    });

    let api_config = ApiServerConfig {
        rest_addr: config.api_addr,
        request_timeout_secs: config.request_timeout_secs,
        frozen_snapshot: config.frozen_snapshot,
    };
    let api_server =
        Arc::new(ApiServer::new(api_config, TemplateFunctions::new(view)).with_metrics(metrics));

    let signal_server = api_server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_server.shutdown();
        }
    });

    api_server.run().await?;

    info!("Selector shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "axum=info"] {
        let directive = directive
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: SocketAddr) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let (status, body) = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => (StatusCode::OK, "ok"),
                _ => (StatusCode::NOT_FOUND, "not found"),
            };
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    info!("Health server listening on {}", addr);
    Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Failed to bind health server: {}", e)))?
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let mut buffer = Vec::new();
                    match encoder.encode(&prometheus::gather(), &mut buffer) {
                        Ok(()) => {
                            let mut response = Response::new(Body::from(buffer));
                            if let Ok(value) = encoder.format_type().parse() {
                                response
                                    .headers_mut()
                                    .insert(hyper::header::CONTENT_TYPE, value);
                            }
                            response
                        }
                        Err(e) => {
                            let mut response = Response::new(Body::from(e.to_string()));
                            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            response
                        }
                    }
                }
                _ => {
                    let mut response = Response::new(Body::from("not found"));
                    *response.status_mut() = StatusCode::NOT_FOUND;
                    response
                }
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    info!("Metrics server listening on {}", addr);
    Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Failed to bind metrics server: {}", e)))?
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
