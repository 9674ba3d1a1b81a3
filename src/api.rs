//! HTTP surface for the enrichment service.
//!
//! - `GET /` – Welcome message.
//! - `GET /health` – Liveness check.
//! - `POST /process` – Run the enrichment pipeline for one uploaded document. Accepts
//!   `{documentId, filePath, organizationName}` (snake_case aliases accepted) and answers with
//!   `{status, documentId}` on success or `{status: "error", message}` on failure.
//! - `GET /metrics` – Enrichment counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::pipeline::{EnrichmentApi, EnrichmentRequest};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const SERVICE_NAME: &str = "doc-enrich";

/// Build the HTTP router exposing the enrichment API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: EnrichmentApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/process", post(process_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Document enrichment service is running" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

/// Request body for the `POST /process` endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    #[serde(alias = "document_id")]
    document_id: String,
    #[serde(alias = "file_path")]
    file_path: String,
    #[serde(alias = "organization_name")]
    organization_name: String,
}

impl ProcessRequest {
    fn validate(self) -> Result<EnrichmentRequest, ApiError> {
        for (field, value) in [
            ("documentId", &self.document_id),
            ("filePath", &self.file_path),
            ("organizationName", &self.organization_name),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::unprocessable(format!("{field} must not be empty")));
            }
        }
        Ok(EnrichmentRequest {
            document_id: self.document_id,
            file_path: self.file_path,
            organization_name: self.organization_name,
        })
    }
}

/// Enrich one document. The pipeline always answers with an envelope; a failed run maps to 500.
async fn process_document<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: EnrichmentApi,
{
    let Json(body) = payload.map_err(|rejection| ApiError::unprocessable(rejection.body_text()))?;
    let request = body.validate()?;
    tracing::info!(
        document_id = %request.document_id,
        path = %request.file_path,
        "Process request received"
    );

    let result = service.process_document(request).await;
    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)).into_response())
}

/// Return the current enrichment counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: EnrichmentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "process",
                method: "POST",
                path: "/process",
                description: "Download an uploaded document, extract its text, generate a summary and exam questions, and persist them. Response returns { \"status\": \"success\", \"documentId\": string }.",
                request_example: Some(json!({
                    "documentId": "3f1c9a52-7d1e-4c1b-9a57-0e4f2b8d6a10",
                    "filePath": "ministry-of-home-affairs/order-2081.pdf",
                    "organizationName": "Ministry of Home Affairs"
                })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness check.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return enrichment counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Error envelope returned before the pipeline runs.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.status, message = %self.message, "Rejected request");
        (
            self.status,
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{EnrichmentApi, EnrichmentRequest, EnrichmentResult};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_process_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let process = commands
            .iter()
            .find(|cmd| cmd.name == "process")
            .expect("process command present");

        assert_eq!(process.method, "POST");
        assert_eq!(process.path, "/process");
        assert!(process.description.to_lowercase().contains("summary"));
    }

    #[tokio::test]
    async fn process_route_forwards_camel_case_payload() {
        let service = Arc::new(StubEnrichmentService::succeeding());
        let app = create_router(service.clone());

        let response = app
            .oneshot(post_json(json!({
                "documentId": "doc-1",
                "filePath": "moha/order.pdf",
                "organizationName": "Ministry of Home Affairs"
            })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body, json!({ "status": "success", "documentId": "doc-1" }));

        let calls = service.recorded_calls().await;
        assert_eq!(
            calls,
            vec![EnrichmentRequest {
                document_id: "doc-1".into(),
                file_path: "moha/order.pdf".into(),
                organization_name: "Ministry of Home Affairs".into(),
            }]
        );
    }

    #[tokio::test]
    async fn process_route_accepts_snake_case_aliases() {
        let service = Arc::new(StubEnrichmentService::succeeding());
        let app = create_router(service.clone());

        let response = app
            .oneshot(post_json(json!({
                "document_id": "doc-2",
                "file_path": "psc/notice.pdf",
                "organization_name": "Public Service Commission"
            })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.recorded_calls().await[0].document_id, "doc-2");
    }

    #[tokio::test]
    async fn failed_run_maps_to_server_error_envelope() {
        let service = Arc::new(StubEnrichmentService::failing("Failed to parse PDF"));
        let app = create_router(service);

        let response = app
            .oneshot(post_json(json!({
                "documentId": "doc-3",
                "filePath": "moha/broken.pdf",
                "organizationName": "Ministry"
            })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Failed to parse PDF");
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let service = Arc::new(StubEnrichmentService::succeeding());
        let app = create_router(service.clone());

        let response = app
            .oneshot(post_json(json!({ "documentId": "doc-4" })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(response).await;
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn blank_fields_are_unprocessable() {
        let service = Arc::new(StubEnrichmentService::succeeding());
        let app = create_router(service.clone());

        let response = app
            .oneshot(post_json(json!({
                "documentId": "doc-5",
                "filePath": "  ",
                "organizationName": "Ministry"
            })))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(response).await;
        assert_eq!(body["message"], "filePath must not be empty");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn health_and_metrics_respond() {
        let app = create_router(Arc::new(StubEnrichmentService::succeeding()));

        let health = app
            .clone()
            .oneshot(get("/health"))
            .await
            .expect("router response");
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(
            read_json(health).await,
            json!({ "status": "healthy", "service": "doc-enrich" })
        );

        let metrics = app.oneshot(get("/metrics")).await.expect("router response");
        assert_eq!(metrics.status(), StatusCode::OK);
        let body = read_json(metrics).await;
        assert_eq!(body["runs_completed"], 4);
        assert_eq!(body["questions_dropped"], 2);
    }

    fn post_json(payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/process")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    struct StubEnrichmentService {
        calls: Mutex<Vec<EnrichmentRequest>>,
        failure: Option<String>,
    }

    impl StubEnrichmentService {
        fn succeeding() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failure: Some(message.to_string()),
            }
        }

        async fn recorded_calls(&self) -> Vec<EnrichmentRequest> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl EnrichmentApi for StubEnrichmentService {
        async fn process_document(&self, request: EnrichmentRequest) -> EnrichmentResult {
            let document_id = request.document_id.clone();
            self.calls.lock().await.push(request);
            match &self.failure {
                Some(message) => EnrichmentResult::error(document_id, message.clone()),
                None => EnrichmentResult::success(document_id),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                runs_started: 5,
                runs_completed: 4,
                runs_failed: 1,
                questions_dropped: 2,
                ..MetricsSnapshot::default()
            }
        }
    }
}
