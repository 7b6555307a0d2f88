//! Route handlers: health, compile, lint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{json_error, AppState, MAX_SOURCE_SIZE};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Pull `source` out of the request body and reject oversized or binary text.
fn extract_source(parsed: &serde_json::Value) -> Result<String, Response> {
    let source = match parsed.get("source").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => {
            return Err(
                json_error(StatusCode::BAD_REQUEST, "missing 'source' field").into_response(),
            )
        }
    };

    if source.len() > MAX_SOURCE_SIZE {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "source content exceeds maximum size",
        )
        .into_response());
    }

    if source.contains('\0') {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "source content must not contain null bytes",
        )
        .into_response());
    }

    Ok(source)
}

/// POST /compile
pub(crate) async fn handle_compile(
    State(state): State<Arc<AppState>>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let source = match extract_source(&parsed) {
        Ok(s) => s,
        Err(response) => return response,
    };

    let config = state.config.clone();
    let result = tokio::task::spawn_blocking(move || {
        courgette_codegen::compile_document(&source, &config)
    })
    .await;

    match result {
        Ok(compilation) => (StatusCode::OK, Json(compilation)).into_response(),
        Err(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("task join error: {}", e),
        )
        .into_response(),
    }
}

/// POST /lint
pub(crate) async fn handle_lint(Json(parsed): Json<serde_json::Value>) -> Response {
    let source = match extract_source(&parsed) {
        Ok(s) => s,
        Err(response) => return response,
    };

    let diagnostics = courgette_core::lint(&source);
    let response = serde_json::json!({ "diagnostics": diagnostics });
    (StatusCode::OK, Json(response)).into_response()
}
