use std::{path::Path, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docenrich::{
    api,
    config::{Config, GenerationProvider},
    pipeline::{EnrichmentApi, EnrichmentService},
};
use httpmock::{
    Method::{GET, PATCH, POST},
    MockServer,
};
use regex::Regex;
use serde_json::json;
use tower::ServiceExt;

fn config_for(server: &MockServer, staging_dir: &Path) -> Config {
    Config {
        store_url: server.base_url(),
        store_service_key: "service-key".into(),
        store_bucket: "documents".into(),
        generation_provider: GenerationProvider::Gemini,
        generation_model: "gemini-1.5-flash".into(),
        gemini_api_key: Some("gemini-key".into()),
        gemini_url: Some(server.base_url()),
        ollama_url: None,
        summary_char_limit: 10_000,
        question_char_limit: 8_000,
        question_count: 10,
        summary_fallback_chars: 500,
        call_timeout_secs: 10,
        staging_dir: staging_dir.to_path_buf(),
        server_port: None,
    }
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [{ "text": text }] } }
        ]
    })
}

fn process_request(document_id: &str, file_path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/process")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "documentId": document_id,
                "filePath": file_path,
                "organizationName": "Ministry of Home Affairs"
            })
            .to_string(),
        ))
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json body")
}

fn router_for(config: &Config) -> (Router, Arc<EnrichmentService>) {
    let service = Arc::new(EnrichmentService::from_config(config).expect("service"));
    (api::create_router(service.clone()), service)
}

#[tokio::test]
async fn process_endpoint_enriches_document_end_to_end() {
    let server = MockServer::start_async().await;
    let staging = tempfile::tempdir().expect("staging dir");
    let config = config_for(&server, staging.path());

    let mark_processing = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/documents")
                .query_param("id", "eq.doc-42")
                .json_body(json!({ "processing_status": "processing" }));
            then.status(204);
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/object/documents/moha/circular-12.txt")
                .header("apikey", "service-key");
            then.status(200)
                .body("Ministry Order 2081: district offices merge from Shrawan 1.");
        })
        .await;
    let summary = json!({
        "summary": "Offices merge.",
        "key_points": ["Merge", "Shrawan 1", "Districts"]
    });
    let summarize = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .header("x-goog-api-key", "gemini-key")
                .body_contains("concise professional summary");
            then.status(200)
                .json_body(gemini_reply(&format!("```json\n{summary}\n```")));
        })
        .await;
    let questions = json!([
        {
            "question_text": "When do the offices merge?",
            "options": ["Baisakh 1", "Shrawan 1", "Magh 1", "Chaitra 1"],
            "correct_index": 1,
            "explanation": "The order names Shrawan 1.",
            "difficulty": "easy"
        },
        {
            "question_text": "Which ministry issued the order?",
            "options": ["Home Affairs", "Finance"],
            "correct_index": 0,
            "explanation": "Too few options."
        }
    ]);
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .body_contains("multiple-choice questions")
                .body_contains("Ministry of Home Affairs");
            then.status(200)
                .json_body(gemini_reply(&questions.to_string()));
        })
        .await;
    let insert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/questions")
                .json_body(json!([
                    {
                        "document_id": "doc-42",
                        "question_text": "When do the offices merge?",
                        "options": ["Baisakh 1", "Shrawan 1", "Magh 1", "Chaitra 1"],
                        "correct_index": 1,
                        "explanation": "The order names Shrawan 1.",
                        "difficulty": "easy"
                    }
                ]));
            then.status(201);
        })
        .await;
    let complete = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/documents")
                .query_param("id", "eq.doc-42")
                .json_body_partial(
                    json!({
                        "processing_status": "completed",
                        "page_count": 1,
                        "ai_summary": "Offices merge.",
                        "key_points": ["Merge", "Shrawan 1", "Districts"]
                    })
                    .to_string(),
                )
                .body_matches(
                    Regex::new(r#""processed_at":"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}"#)
                        .expect("regex"),
                );
            then.status(204);
        })
        .await;

    let (app, service) = router_for(&config);
    let response = app
        .oneshot(process_request("doc-42", "moha/circular-12.txt"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({ "status": "success", "documentId": "doc-42" })
    );
    mark_processing.assert_hits(1);
    download.assert_hits(1);
    summarize.assert_hits(1);
    generate.assert_hits(1);
    insert.assert_hits(1);
    complete.assert_hits(1);

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.runs_completed, 1);
    assert_eq!(snapshot.questions_inserted, 1);
    assert_eq!(snapshot.questions_dropped, 1);
    assert!(
        std::fs::read_dir(staging.path())
            .expect("staging dir")
            .next()
            .is_none()
    );
}

#[tokio::test]
async fn missing_object_marks_document_failed() {
    let server = MockServer::start_async().await;
    let staging = tempfile::tempdir().expect("staging dir");
    let config = config_for(&server, staging.path());

    let mark_processing = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/documents")
                .json_body(json!({ "processing_status": "processing" }));
            then.status(204);
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/storage/v1/object/documents/moha/missing.pdf");
            then.status(404)
                .json_body(json!({ "statusCode": "404", "error": "not_found" }));
        })
        .await;
    let mark_failed = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/rest/v1/documents")
                .query_param("id", "eq.doc-43")
                .json_body(json!({ "processing_status": "failed" }));
            then.status(204);
        })
        .await;
    let gemini = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(200).json_body(gemini_reply("{}"));
        })
        .await;

    let (app, service) = router_for(&config);
    let response = app
        .oneshot(process_request("doc-43", "moha/missing.pdf"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.contains("404")),
        "{body}"
    );
    mark_processing.assert_hits(1);
    download.assert_hits(1);
    mark_failed.assert_hits(1);
    gemini.assert_hits(0);
    assert_eq!(service.metrics_snapshot().runs_failed, 1);
}
