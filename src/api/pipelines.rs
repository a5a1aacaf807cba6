//! Pipeline lifecycle endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;
use super::types::{
    ApiError, DeleteResponse, IngestionResponse, Json, PipelineListResponse, QueryRequest,
    QueryResponse,
};
use crate::domain::ingestion::DocumentUpload;
use crate::domain::pipeline::PipelineId;

/// Multipart field carrying the uploaded document
const FILE_FIELD: &str = "file";

pub fn create_pipeline_router() -> Router<AppState> {
    Router::new()
        .route("/create/{id}", post(create_pipeline))
        .route("/addData/{id}", post(add_data))
        .route("/query/{id}", post(query_pipeline))
        .route("/pipeline/{id}", delete(delete_pipeline))
        .route("/pipelines", get(list_pipelines))
}

fn parse_id(raw: &str) -> Result<PipelineId, ApiError> {
    raw.parse::<PipelineId>()
        .map_err(|e| ApiError::from(e).with_param("id"))
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DocumentUpload, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::bad_request(format!("Expected a multipart upload: {}", e.body_text()))
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            ApiError::bad_request(format!("Could not read uploaded file: {}", e.body_text()))
        })?;

        return Ok(DocumentUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::bad_request("Missing multipart field 'file'").with_param(FILE_FIELD))
}

async fn create_pipeline(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<IngestionResponse>), ApiError> {
    let id = parse_id(&raw_id)?;
    let upload = read_upload(multipart).await?;

    let summary = state.pipeline_service.create_pipeline(id, upload).await?;

    Ok((StatusCode::CREATED, Json(summary.into())))
}

async fn add_data(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestionResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let upload = read_upload(multipart).await?;

    let summary = state.pipeline_service.add_data(id, upload).await?;

    Ok(Json(summary.into()))
}

async fn query_pipeline(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let request = payload.into_inner();

    let answer = state
        .pipeline_service
        .query(id, &request.question)
        .await?;

    Ok(Json(answer.into()))
}

async fn delete_pipeline(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&raw_id)?;

    let summary = state.pipeline_service.delete_pipeline(id).await?;

    Ok(Json(summary.into()))
}

async fn list_pipelines(
    State(state): State<AppState>,
) -> Result<Json<PipelineListResponse>, ApiError> {
    let ids = state.pipeline_service.list_pipelines().await?;

    Ok(Json(ids.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::ingestion::ChunkingConfig;
    use crate::infrastructure::embedding::HashingEmbeddingProvider;
    use crate::infrastructure::generation::ExtractiveAnswerGenerator;
    use crate::infrastructure::ingestion::ChunkingDocumentProcessor;
    use crate::infrastructure::registry::InMemoryRegistryIndex;
    use crate::infrastructure::services::PipelineService;
    use crate::infrastructure::vector_store::FileVectorStorage;

    const BOUNDARY: &str = "rag-matrix-test-boundary";

    async fn app(root: &std::path::Path) -> Router {
        let storage = FileVectorStorage::open(root, Arc::new(HashingEmbeddingProvider::default()))
            .await
            .unwrap();
        let service = PipelineService::new(
            Arc::new(InMemoryRegistryIndex::new()),
            Arc::new(storage),
            Arc::new(ChunkingDocumentProcessor::with_defaults(ChunkingConfig::default()).unwrap()),
            Arc::new(ExtractiveAnswerGenerator::new()),
        );

        create_pipeline_router().with_state(AppState::new(Arc::new(service)))
    }

    fn upload(uri: &str, field: &str, filename: &str, content: &str) -> Request<Body> {
        let content_type = if filename.ends_with(".txt") {
            "text/plain"
        } else {
            "application/octet-stream"
        };
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn query(uri: &str, question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    fn delete_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    #[tokio::test]
    async fn test_full_lifecycle_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(
            &app,
            upload("/create/42", "file", "tower.txt", "The Eiffel Tower is in Paris."),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pipeline_id"], 42);
        assert_eq!(body["fragments"], 1);

        let (status, body) = send(
            &app,
            upload("/create/42", "file", "other.txt", "Something else entirely."),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict_error");

        let (status, body) = send(
            &app,
            upload("/addData/42", "file", "wall.txt", "The Great Wall is in China."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fragments"], 1);

        let (status, body) = send(&app, query("/query/42", "Where is the Great Wall?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "The Great Wall is in China.");
        assert_eq!(body["sources"].as_array().unwrap().len(), 2);
        assert_eq!(body["sources"][0]["metadata"]["source"], "wall.txt");

        let (status, body) = send(
            &app,
            Request::builder()
                .uri("/pipelines")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pipelines"], serde_json::json!([42]));
        assert_eq!(body["total"], 1);

        let (status, body) = send(&app, delete_request("/pipeline/42")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], true);

        let (status, _) = send(&app, query("/query/42", "Where is the Great Wall?")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, delete_request("/pipeline/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        for uri in ["/create/0", "/create/-3", "/create/abc"] {
            let (status, body) = send(&app, upload(uri, "file", "a.txt", "text")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["param"], "id");
        }

        let (status, _) = send(&app, delete_request("/pipeline/0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_or_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(&app, upload("/create/1", "document", "a.txt", "text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "file");

        let (status, _) = send(&app, upload("/create/1", "file", "a.exe", "MZ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, upload("/create/1", "file", "a.txt", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, query("/query/1", "anything")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_add_data_to_missing_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, _) = send(&app, upload("/addData/5", "file", "a.txt", "More text.")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_query_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let request = Request::builder()
            .method("POST")
            .uri("/query/1")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_json");
    }
}
