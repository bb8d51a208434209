//! HTTP endpoint modules.
//!
//! Each sub-module owns one area; shared error plumbing lives here.

pub mod diagnostics;
pub mod doc;
pub mod health;
pub mod scheduler;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use utoipa::ToSchema;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Decode a JSON body, mapping any failure to 400. An empty body decodes as
/// `{}` so endpoints with all-optional fields accept a bare POST.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body[..]
    };
    serde_json::from_slice(raw)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Sample {
        n: u32,
    }

    #[test]
    fn empty_body_is_empty_object() {
        let p: Sample = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert_eq!(p.n, 0);
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = parse_body::<Sample>(&Bytes::from_static(b"{nope")).err().unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1.error.starts_with("Invalid request body"));
    }
}
