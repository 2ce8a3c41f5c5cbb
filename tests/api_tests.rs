//! HTTP API tests over the full router with mock clients.

mod common;

use axum_test::multipart::{MultipartForm, Part};
use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::{MockLLMClient, VALID_COMPLETION};
use common::{catalog_csv, harness, Harness};
use serde_json::{json, Value};
use sophia::utils::toml_config::{RagConfig, SophiaConfig};
use sophia::db::{InMemoryVectorIndex, VectorIndex};
use sophia::AppState;
use std::sync::Arc;
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    index: Arc<InMemoryVectorIndex>,
    llm: Arc<MockLLMClient>,
    upload_dir: TempDir,
}

fn app(llm: MockLLMClient) -> TestApp {
    let Harness {
        pipeline,
        index,
        llm,
        ..
    } = harness(llm, RagConfig::default());

    let upload_dir = TempDir::new().unwrap();
    let mut config = SophiaConfig::default();
    config.server.upload_dir = upload_dir.path().to_path_buf();

    let state = AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };
    let server = TestServer::new(sophia::api::build_app(state)).unwrap();

    TestApp {
        server,
        index,
        llm,
        upload_dir,
    }
}

fn catalog_form() -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(catalog_csv().as_bytes().to_vec())
            .file_name("catalog.csv")
            .mime_type("text/csv"),
    )
}

// ============= Health =============

#[tokio::test]
async fn test_health_reports_index_state() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chat_model"], "mock-chat");
    assert_eq!(body["embedding_model"], common::EMBEDDING_MODEL);
    assert_eq!(body["index"]["provider"], "memory");
    assert_eq!(body["index"]["namespace"], "books");
    assert_eq!(body["index"]["records"], 0);
}

// ============= Upload =============

#[tokio::test]
async fn test_upload_stores_and_ingests_file() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let response = app
        .server
        .post("/api/book/upload")
        .multipart(catalog_form())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sourceId"], "catalog");
    assert_eq!(body["namespace"], "books");
    assert!(body["recordsUpserted"].as_u64().unwrap() >= 1);

    // <upload_dir>/<millis>-<seq>/catalog.csv
    let stored: Vec<_> = std::fs::read_dir(app.upload_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path().join("catalog.csv"))
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].exists());

    assert!(app.index.count("books").await.unwrap() >= 1);
}

#[tokio::test]
async fn test_repeated_uploads_are_kept_apart() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    for _ in 0..3 {
        app.server
            .post("/api/book/upload")
            .multipart(catalog_form())
            .await
            .assert_status_ok();
    }

    let dirs: Vec<_> = std::fs::read_dir(app.upload_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(dirs.len(), 3);
    assert!(dirs.iter().all(|dir| dir.join("catalog.csv").exists()));
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = app.server.post("/api/book/upload").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["kind"], "input");
}

#[tokio::test]
async fn test_upload_of_unsupported_format_is_rejected() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.7".to_vec()).file_name("catalog.pdf"),
    );
    let response = app.server.post("/api/book/upload").multipart(form).await;

    response.assert_status_bad_request();
}

// ============= Recommend =============

#[tokio::test]
async fn test_recommend_returns_items_and_sources() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));
    app.server
        .post("/api/book/upload")
        .multipart(catalog_form())
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/book/recommend")
        .json(&json!({ "searchData": "philosophy of mind" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["title"], "「昭和」を送る");
    assert!(items.iter().all(|item| item["reason"].is_string()));

    let sources = body["sourceDocuments"].as_array().unwrap();
    assert!(!sources.is_empty());
    assert_eq!(sources[0]["metadata"]["source"], "catalog");
    assert!(sources[0]["pageContent"].is_string());
}

#[tokio::test]
async fn test_recommend_on_empty_namespace_is_unprocessable() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let response = app
        .server
        .post("/api/book/recommend")
        .json(&json!({ "searchData": "philosophy of mind" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["kind"], "schema_validation");
    assert!(body["error"].as_str().unwrap().contains("philosophy of mind"));
    assert_eq!(app.llm.stream_calls(), 0);
}

#[tokio::test]
async fn test_recommend_with_blank_question_is_bad_request() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));

    let response = app
        .server
        .post("/api/book/recommend")
        .json(&json!({ "searchData": "   " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_recommend_with_llm_failure_is_bad_gateway() {
    let app = app(MockLLMClient::failing());
    app.server
        .post("/api/book/upload")
        .multipart(catalog_form())
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/book/recommend")
        .json(&json!({ "searchData": "Spinoza" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["kind"], "external_service");
}

// ============= Delete =============

#[tokio::test]
async fn test_delete_clears_namespace() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));
    app.server
        .post("/api/book/upload")
        .multipart(catalog_form())
        .await
        .assert_status_ok();

    let response = app.server.delete("/api/book/data").await;

    response.assert_status_ok();
    response.assert_json(&json!({ "namespace": "books", "deleted": true }));

    let health: Value = app.server.get("/health").await.json();
    assert_eq!(health["index"]["records"], 0);

    app.server
        .post("/api/book/recommend")
        .json(&json!({ "searchData": "Spinoza" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_legacy_paths_recommend_and_delete() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));
    app.server
        .post("/api/book/upload")
        .multipart(catalog_form())
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/book/recommendBook")
        .json(&json!({ "searchData": "philosophy of mind" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);

    let response = app.server.delete("/api/book/deleteData").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "namespace": "books", "deleted": true }));
    assert_eq!(app.index.count("books").await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app(MockLLMClient::new(VALID_COMPLETION));
    app.server
        .get("/api/book/unknown")
        .await
        .assert_status_not_found();
}
