//! `courgette serve` -- local HTTP service around the compiler and linter.
//!
//! Endpoints:
//! - GET  /health   - Server status
//! - POST /compile  - Compile `{"source": ...}` to rules, parameters and diagnostics
//! - POST /lint     - Lint `{"source": ...}`
//!
//! With `--dir`, unmatched routes serve static files from that directory
//! (the editor front end). CORS is permissive; the service is meant for
//! local use.

mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use courgette_codegen::GenerateConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use self::handlers::{handle_compile, handle_health, handle_lint, handle_not_found};

/// Maximum request body size: 10 MB.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Maximum source text accepted by /compile and /lint: 1 MB.
const MAX_SOURCE_SIZE: usize = 1024 * 1024;

pub(crate) struct AppState {
    pub config: GenerateConfig,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(handle_health))
        .route("/compile", post(handle_compile))
        .route("/lint", post(handle_lint));

    let routes = match static_dir {
        Some(dir) => routes.fallback_service(ServeDir::new(dir)),
        None => routes.fallback(handle_not_found),
    };

    routes
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port.
pub async fn start_server(
    port: u16,
    static_dir: Option<PathBuf>,
    config: GenerateConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = &static_dir {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "static directory does not exist");
        }
    }

    let state = Arc::new(AppState { config });
    let app = router(state, static_dir);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Courgette listening on http://0.0.0.0:{}", port);
    info!(port, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
