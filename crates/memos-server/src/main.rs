//! Binary entrypoint. Loads `ServerConfig`, wires the in-memory service
//! layer the way `memos-api`'s test harness does, and serves the router.
//!
//! Every repo/index is the in-memory implementation; swapping to a
//! Postgres/Redis-backed one is a matter of implementing the same traits
//! and changing the types this module monomorphizes over — the service
//! layer above is already generic over them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use memos_api::ApiServer;
use memos_api::state::ApiState;
use memos_core::config::ServerConfig;
use memos_goalgraph::{
    GoalGraphService, InMemoryGoalActivityLogRepo, InMemoryGoalEdgeRepo,
    InMemoryGoalMemoryLinkRepo, InMemoryGoalNodeRepo, InMemoryGoalRepo,
};
use memos_observability::{init_tracing, LogFormat, TracingConfig};
use memos_permission::{InMemoryRoleProvider, PermissionKernel};
use memos_retrieval::{InMemoryExplanationSink, InMemoryFeedbackRepo, SearchConfig, SearchEngine};
use memos_scheduler::{InMemoryTaskQueue, SchedulerService};
use memos_store::{
    InMemoryActivationRepo, InMemoryCausalHypothesisRepo, InMemoryCoactivationRepo,
    InMemoryLexicalIndex, InMemoryMemoryRepo, InMemoryVectorIndex, MemoryStore,
};

#[derive(Debug, Parser)]
#[command(name = "memos-server", about = "Multi-tenant memory operating system HTTP server", version)]
struct Args {
    /// Directory holding `default.toml` and `{env}.toml`.
    #[arg(long, env = "MEMOS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay name, e.g. "development" or "production".
    #[arg(long, env = "MEMOS_ENV", default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(args.config_dir.as_deref(), &args.env)
        .with_context(|| format!("failed to load configuration for environment '{}'", args.env))?;

    let tracing_config = TracingConfig {
        service_name: "memos-server".into(),
        log_format: LogFormat::from_str(&config.observability.log_format).unwrap_or(LogFormat::Pretty),
        log_level: config.observability.log_level.clone(),
    };
    let _tracing_guard = init_tracing(&tracing_config).context("failed to initialize tracing")?;

    let socket_addr: SocketAddr = config
        .server
        .bind_address()
        .with_context(|| format!("invalid bind address '{}:{}'", config.server.host, config.server.port))?;

    let state = build_state(&config);
    let server = ApiServer::new(state);
    let router = server
        .router()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors.allowed_origins));

    let listener = TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("failed to bind {socket_addr}"))?;

    info!(%socket_addr, env = %args.env, "starting memos-server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("memos-server exited unexpectedly")?;

    Ok(())
}

/// Monomorphizes every service over the crate's in-memory repo/index
/// implementations, the same way `memos-api`'s test harness does.
fn build_state(config: &ServerConfig) -> ApiState {
    let role_provider = InMemoryRoleProvider::new(Vec::new(), Vec::new());
    let permissions = Arc::new(PermissionKernel::new(
        role_provider,
        Duration::from_secs(config.cache.permission_cache_ttl_seconds),
    ));
    let audit = Arc::new(memos_audit::InMemoryAuditSink::default());

    let memory_repo = Arc::new(InMemoryMemoryRepo::default());
    let activation_repo = Arc::new(InMemoryActivationRepo::default());
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    let coactivation_repo = Arc::new(InMemoryCoactivationRepo::default());
    let causal_repo = Arc::new(InMemoryCausalHypothesisRepo::default());
    let lexical_index = Arc::new(InMemoryLexicalIndex::default());
    let feedback_repo = Arc::new(InMemoryFeedbackRepo::default());
    let explanation_sink: Arc<dyn memos_retrieval::ExplanationSink> = Arc::new(InMemoryExplanationSink::default());
    let feedback_trait_repo: Arc<dyn memos_retrieval::FeedbackRepo> = Arc::new(InMemoryFeedbackRepo::default());
    let task_queue = Arc::new(InMemoryTaskQueue::default());

    let memories = Arc::new(MemoryStore::new(
        memory_repo.clone(),
        activation_repo.clone(),
        vector_index.clone(),
        audit.clone(),
        permissions.clone(),
    ));

    let search = Arc::new(SearchEngine::new(
        memory_repo,
        vector_index,
        lexical_index,
        activation_repo.clone(),
        coactivation_repo.clone(),
        feedback_repo,
        explanation_sink.clone(),
        audit.clone(),
        task_queue.clone(),
        SearchConfig::from_search_section(&config.search),
    ));

    let scheduler = Arc::new(SchedulerService::new(task_queue, permissions.clone()));

    let goals = Arc::new(GoalGraphService::new(
        Arc::new(InMemoryGoalRepo::default()),
        Arc::new(InMemoryGoalNodeRepo::default()),
        Arc::new(InMemoryGoalEdgeRepo::default()),
        Arc::new(InMemoryGoalMemoryLinkRepo::default()),
        Arc::new(InMemoryGoalActivityLogRepo::default()),
        permissions,
        audit,
    ));

    ApiState::new(
        memories,
        search,
        scheduler,
        goals,
        coactivation_repo,
        causal_repo,
        activation_repo,
        explanation_sink,
        feedback_trait_repo,
        config.jwt.secret.clone(),
    )
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received, stopping memos-server");
    } else {
        warn!("failed to listen for Ctrl+C shutdown signal");
    }
}
