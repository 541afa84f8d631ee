pub mod dto;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;

pub use dto::*;
pub use error::{ApiError, ApiResult};
pub use server::*;

use axum::{routing::get, Router};
use pipeline_core::domain::Experiment;
use pipeline_core::{PageTokenCodec, ResourceManager};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub experiments: ExperimentServer,
}

impl AppState {
    pub fn new(manager: Arc<dyn ResourceManager<Experiment>>, codec: PageTokenCodec) -> Self {
        Self {
            experiments: ExperimentServer::new(manager, codec),
        }
    }
}

/// Experiment routes, relative to the API prefix.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/experiments",
            get(handlers::experiments::list).post(handlers::experiments::create),
        )
        .route(
            "/experiments/:id",
            get(handlers::experiments::get).delete(handlers::experiments::delete),
        )
        .with_state(state)
}
