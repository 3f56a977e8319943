use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use immo_market::marketplace::{
    marketplace_router, ListingRepository, MarketplaceState, PaymentRepository,
};
use serde_json::json;
use std::io::ErrorKind;
use tracing::error;

/// Marketplace API plus the operational endpoints and the upload file server.
pub(crate) fn with_service_routes<L, P>(state: MarketplaceState<L, P>) -> Router
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    marketplace_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/uploads/:name", get(upload_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves a stored listing photo by its bare file name.
pub(crate) async fn upload_endpoint(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> Response {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("upload '{name}' not found") })),
        )
            .into_response()
    };

    let Some(path) = state.uploads.resolve(&name) else {
        return not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type.essence_str().to_string())],
                bytes,
            )
                .into_response()
        }
        Err(err) if err.kind() == ErrorKind::NotFound => not_found(),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to read upload");
            let payload = json!({ "error": "upload unavailable" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
