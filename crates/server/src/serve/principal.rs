//! Principal extraction from trusted identity headers.
//!
//! Identity/auth is an external collaborator: something in front of this
//! service authenticates the caller and forwards `{id, role}` in headers.
//! The core trusts those values and uses them only for authorization.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookd_core::{Principal, Role};
use uuid::Uuid;

/// Header carrying the authenticated user id (UUID).
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
/// Header carrying the authenticated role (`customer` or `worker`).
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// Extractor wrapping the authenticated [`Principal`].
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, PRINCIPAL_ID_HEADER)?;
        let id: Uuid = id
            .parse()
            .map_err(|_| reject(StatusCode::BAD_REQUEST, "malformed principal id"))?;

        let role = match header_value(parts, PRINCIPAL_ROLE_HEADER)? {
            r if r.eq_ignore_ascii_case("customer") => Role::Customer,
            r if r.eq_ignore_ascii_case("worker") => Role::Worker,
            _ => return Err(reject(StatusCode::BAD_REQUEST, "unknown principal role")),
        };

        Ok(Caller(Principal { id, role }))
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, Response> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "authentication required"))
}

fn reject(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}
