use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use crate::{dto::*, error::ApiResult, AppState};

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateExperimentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ExperimentResponse>)> {
    let Json(payload) = payload?;

    let experiment = state.experiments.create(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(experiment.into())))
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListExperimentsQuery>, QueryRejection>,
) -> ApiResult<Json<ListExperimentsResponse>> {
    let Query(query) = query?;

    let page = state.experiments.list(query.into()).await?;

    Ok(Json(page.into()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExperimentResponse>> {
    let experiment = state.experiments.get(&id).await?;

    Ok(Json(experiment.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.experiments.delete(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}
