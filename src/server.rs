// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! REST surface consumed by the desktop frontend
//!
//! Serves the update endpoints under `/api/updates` plus a health check.
//! The update service itself is blocking (synchronous HTTP client and
//! filesystem work), so handlers run it under `spawn_blocking`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::updater::UpdateService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest {
    #[serde(default)]
    download_url: Option<String>,
}

/// Build the application router
pub fn router(service: Arc<UpdateService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/updates/check", get(check_updates_handler))
        .route("/api/updates/download", post(download_update_handler))
        .route("/api/updates/info", get(update_info_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Bind the listener and serve until shutdown
///
/// # Errors
/// Fails when the port cannot be bound or the server loop errors out.
pub async fn serve(port: u16, service: Arc<UpdateService>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    info!("server running on http://{addr}");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

#[instrument(skip(service))]
async fn check_updates_handler(State(service): State<Arc<UpdateService>>) -> Response {
    let worker = Arc::clone(&service);
    match tokio::task::spawn_blocking(move || worker.check_for_updates()).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!("update check task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "hasUpdate": false,
                    "error": "Failed to check for updates",
                    "currentVersion": service.current_version(),
                })),
            )
                .into_response()
        }
    }
}

#[instrument(skip(service, request))]
async fn download_update_handler(
    State(service): State<Arc<UpdateService>>,
    Json(request): Json<DownloadRequest>,
) -> Response {
    let Some(download_url) = request.download_url.filter(|url| !url.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Download URL is required",
            })),
        )
            .into_response();
    };

    match tokio::task::spawn_blocking(move || service.download_update(&download_url)).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!("update download task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Failed to download update",
                })),
            )
                .into_response()
        }
    }
}

#[instrument(skip(service))]
async fn update_info_handler(State(service): State<Arc<UpdateService>>) -> Response {
    match tokio::task::spawn_blocking(move || service.check_info()).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => {
            error!("update info task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found_handler(method: Method, uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found: {method} {uri}"),
        })),
    )
        .into_response()
}
