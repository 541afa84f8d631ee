use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pipeline_api::{AppState, ExperimentResponse, ListExperimentsResponse};
use pipeline_core::PageTokenCodec;
use pipeline_storage::InMemoryExperimentStore;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// ===== Test Helper Functions =====

fn app() -> Router {
    let state = AppState::new(
        Arc::new(InMemoryExperimentStore::new()),
        PageTokenCodec::new("http-tests-secret-key"),
    );
    pipeline_api::routes(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri("/experiments")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method("DELETE")
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn list(app: &Router, query: &str) -> ListExperimentsResponse {
    let (status, body) = get(app, &format!("/experiments?{}", query)).await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    serde_json::from_value(body).unwrap()
}

fn names(page: &ListExperimentsResponse) -> Vec<&str> {
    page.experiments.iter().map(|e| e.name.as_str()).collect()
}

// ===== Create / Get / Delete =====

#[tokio::test]
async fn test_create_then_get() {
    let app = app();

    let (status, body) = create(&app, json!({"name": "baseline", "description": "first"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: ExperimentResponse = serde_json::from_value(body).unwrap();
    assert!(!created.id.is_nil());
    assert_eq!(created.description.as_deref(), Some("first"));

    let (status, body) = get(&app, &format!("/experiments/{}", created.id)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: ExperimentResponse = serde_json::from_value(body).unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let app = app();
    let (_, first) = create(&app, json!({"name": "same"})).await;
    let (_, second) = create(&app, json!({"name": "same"})).await;
    assert_ne!(first["id"], second["id"]);
}

#[tokio::test]
async fn test_empty_name_is_rejected_and_nothing_is_stored() {
    let app = app();

    let (status, body) = create(&app, json!({"name": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("Experiment name is empty"));

    let page = list(&app, "").await;
    assert!(page.experiments.is_empty());
    assert_eq!(page.next_page_token, "");
}

#[tokio::test]
async fn test_missing_name_is_rejected() {
    let app = app();
    let (status, _) = create(&app, json!({"description": "no name"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = app();
    let request = Request::builder()
        .uri("/experiments")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let app = app();
    let uri = format!("/experiments/{}", Uuid::new_v4());

    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Get experiment failed"));

    let (status, body) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Delete experiment failed"));
}

#[tokio::test]
async fn test_non_uuid_id_is_not_found() {
    let app = app();

    let (status, body) = get(&app, "/experiments/unknown-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Get experiment failed"));

    let (status, body) = delete(&app, "/experiments/unknown-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Delete experiment failed"));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let app = app();
    let (_, body) = create(&app, json!({"name": "short-lived"})).await;
    let uri = format!("/experiments/{}", body["id"].as_str().unwrap());

    let (status, body) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_then_get_of_non_uuid_id_is_not_found() {
    let app = app();
    create(&app, json!({"name": "kept"})).await;

    let (status, _) = delete(&app, "/experiments/kept").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/experiments/kept").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let page = list(&app, "").await;
    assert_eq!(names(&page), vec!["kept"]);
}

// ===== List =====

#[tokio::test]
async fn test_list_pages_in_creation_order() {
    let app = app();
    for name in ["a", "b", "c"] {
        create(&app, json!({ "name": name })).await;
    }

    let first = list(&app, "page_size=2").await;
    assert_eq!(names(&first), vec!["a", "b"]);
    assert!(!first.next_page_token.is_empty());

    let second = list(&app, &format!("page_token={}", first.next_page_token)).await;
    assert_eq!(names(&second), vec!["c"]);
    assert_eq!(second.next_page_token, "");
}

#[tokio::test]
async fn test_list_descending_by_name() {
    let app = app();
    for name in ["b", "c", "a"] {
        create(&app, json!({ "name": name })).await;
    }

    let first = list(&app, "page_size=2&sort_by=name%20desc").await;
    assert_eq!(names(&first), vec!["c", "b"]);

    let second = list(
        &app,
        &format!("sort_by=name%20desc&page_token={}", first.next_page_token),
    )
    .await;
    assert_eq!(names(&second), vec!["a"]);
}

#[tokio::test]
async fn test_list_rejects_bad_parameters() {
    let app = app();

    for query in [
        "page_size=-1",
        "page_size=201",
        "page_size=ten",
        "sort_by=owner",
        "page_token=garbage",
    ] {
        let (status, body) = get(&app, &format!("/experiments?{}", query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {}", query);
        assert_eq!(body["code"], "invalid_input", "query {}", query);
    }
}

#[tokio::test]
async fn test_list_token_with_changed_sort_is_rejected() {
    let app = app();
    for name in ["a", "b"] {
        create(&app, json!({ "name": name })).await;
    }

    let first = list(&app, "page_size=1&sort_by=name").await;
    let (status, body) = get(
        &app,
        &format!("/experiments?sort_by=id&page_token={}", first.next_page_token),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("List experiments failed"));
}
