use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::domain::ListingStatus;
use super::images::ImageStoreError;
use super::repository::RepositoryError;
use super::validation::ValidationError;

/// Error raised by the lifecycle and query services.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("listing '{id}' is already {current}")]
    InvalidState { id: String, current: ListingStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Images(#[from] ImageStoreError),
    #[error("export failed: {0}")]
    Export(String),
}

impl MarketplaceError {
    pub(crate) fn listing_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "listing",
            id: id.to_string(),
        }
    }

    pub(crate) fn payment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "payment",
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::InvalidState { .. } => StatusCode::CONFLICT,
            MarketplaceError::Images(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            MarketplaceError::Repository(_)
            | MarketplaceError::Images(_)
            | MarketplaceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "marketplace request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
