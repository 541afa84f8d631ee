use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pipeline_core::{CoreError, ErrorKind};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Core(err) => err.kind(),
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::InvalidInput => "Invalid input",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::Internal => {
                tracing::error!("Internal error: {}", self);
                "Internal server error"
            }
        };

        let body = json!({
            "error": message,
            "code": kind.as_str(),
            "details": self.to_string(),
        });

        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pipeline_core::ResultExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_wrapped_not_found_maps_to_404() {
        let err: pipeline_core::Result<()> = Err(CoreError::not_found("Experiment x not found"));
        let err = err.context("Get experiment failed").unwrap_err();

        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
        assert_eq!(
            body["details"],
            "Get experiment failed: Not found: Experiment x not found"
        );
    }

    #[tokio::test]
    async fn test_invalid_input_maps_to_400() {
        let (status, body) = body_json(CoreError::invalid_input("bad").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(body["error"], "Invalid input");
    }

    #[tokio::test]
    async fn test_internal_maps_to_500() {
        let (status, body) = body_json(CoreError::Database("pool closed".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");
    }

    #[test]
    fn test_bad_request_is_invalid_input() {
        let err = ApiError::BadRequest("unreadable body".into());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
