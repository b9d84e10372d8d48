use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use facesharp_core::AnalysisResult;
use serde_json::{json, Value};

use crate::engine::EngineHandle;

pub fn router(engine: EngineHandle) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .with_state(engine)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "FaceSharp",
        "version": facesharp_core::MODEL_VERSION,
        "description": "Face quality assessment with meme labels",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(detail: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({"detail": detail})))
}

fn service_error(detail: String) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": format!("Analysis failed: {detail}")})),
    )
}

/// Analyze one uploaded image; mirrors the single-file upload contract.
async fn analyze(
    State(engine): State<EngineHandle>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| bad_request(&format!("upload read failed: {err}")))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|_| bad_request("Invalid image format"))?;
        let result = engine
            .analyze(image)
            .await
            .map_err(|err| service_error(err.to_string()))?;
        return Ok(Json(result));
    }
    Err(bad_request("missing file field"))
}

/// Analyze every uploaded file; per-file failures are reported inline and
/// never abort the batch.
async fn analyze_batch(
    State(engine): State<EngineHandle>,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut results = Vec::new();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                results.push(json!({"filename": filename, "ok": false, "error": err.to_string()}));
                continue;
            }
        };
        match image::load_from_memory(&bytes) {
            Err(_) => {
                results.push(json!({
                    "filename": filename,
                    "ok": false,
                    "error": "Invalid image format",
                }));
            }
            Ok(image) => match engine.analyze(image).await {
                Ok(result) => results.push(json!({
                    "filename": filename,
                    "ok": result.ok,
                    "axes": result.axes,
                    "label": result.label,
                    "confidence": result.confidence,
                })),
                Err(err) => {
                    results.push(json!({"filename": filename, "ok": false, "error": err.to_string()}));
                }
            },
        }
    }

    Json(json!({"results": results}))
}
