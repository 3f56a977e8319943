use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

/// Server-held admin secret. Requests prove knowledge of it with
/// `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct AdminCredential {
    token: Arc<str>,
}

impl AdminCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }

    /// Compares without short-circuiting on the first differing byte.
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.token.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (left, right)| acc | (left ^ right))
            == 0
    }

    pub fn authorizes(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .is_some_and(|token| self.verify(token))
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential").finish_non_exhaustive()
    }
}

fn bearer_token(raw: &str) -> Option<&str> {
    let (scheme, token) = raw.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Route layer guarding every admin endpoint.
pub(crate) async fn require_admin(
    State(credential): State<AdminCredential>,
    request: Request,
    next: Next,
) -> Response {
    if credential.authorizes(request.headers()) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "admin credential rejected");
    let payload = json!({ "error": "admin credential required" });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}
