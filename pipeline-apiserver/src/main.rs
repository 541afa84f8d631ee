use anyhow::Result;
use axum::{middleware, routing::get, Router};
use pipeline_api::observability::{
    init_logging, request_logging_middleware, RedactedMakeSpan, RequestLoggingState,
};
use pipeline_api::AppState;
use pipeline_core::domain::Experiment;
use pipeline_core::{PageTokenCodec, ResourceManager};
use pipeline_storage::{ExperimentRepository, InMemoryExperimentStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;

use config::{Config, StorageBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(config.log.clone()).map_err(|err| anyhow::anyhow!(err))?;

    tracing::info!("Starting pipeline API server");

    let manager = experiment_manager(&config).await?;
    let codec = PageTokenCodec::new(config.page_token_secret());
    let api_state = AppState::new(manager, codec);

    let app = Router::new()
        .route("/healthz", get(health_check))
        .nest("/apis/v1beta1", pipeline_api::routes(api_state))
        .layer(middleware::from_fn_with_state(
            RequestLoggingState::new(&config.log),
            request_logging_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(RedactedMakeSpan::new(&config.log)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn experiment_manager(config: &Config) -> Result<Arc<dyn ResourceManager<Experiment>>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory experiment storage");
            Ok(Arc::new(InMemoryExperimentStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = pipeline_storage::create_pool_with_config(&config.database).await?;
            pipeline_storage::migrate(&pool).await?;
            pipeline_storage::health_check(&pool).await?;
            tracing::info!("Using PostgreSQL experiment storage");
            Ok(Arc::new(ExperimentRepository::new(pool)))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => {
            tracing::error!("Failed to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    }
}
