use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use consult_service::config::ServiceConfig;
use consult_service::llm_client::{LlmClient, ModelInvoker};
use consult_service::pipeline::ReportPipeline;
use consult_service::report::SystemStamp;
use consult_service::routes::AppState;
use consult_service::storage::FileSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env();
    info!("consult-service starting on {}", config.bind_addr);

    let invoker: Option<Arc<dyn ModelInvoker>> = match config.llm.backend() {
        Some(backend) => {
            info!("LLM backend: {} ({})", backend.endpoint, backend.model);
            Some(Arc::new(LlmClient::new(backend)?))
        }
        None => {
            warn!("no OPENROUTER_API_KEY or OPENAI_API_KEY configured; serving fallback reports");
            None
        }
    };

    let stamp = Arc::new(SystemStamp);
    let store = Arc::new(
        FileSessionStore::new(config.data_dir.clone())
            .await
            .with_context(|| format!("failed to open session store at {:?}", config.data_dir))?,
    );
    info!("session store: {:?}", config.data_dir);

    let state = AppState {
        pipeline: Arc::new(ReportPipeline::new(invoker, stamp.clone())),
        store,
        stamp,
    };

    let app = consult_service::create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("consult-service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install ctrl-c handler: {}", e);
        return;
    }
    info!("shutdown signal received");
}
