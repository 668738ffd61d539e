//! Caller identity extraction.
//!
//! The platform gateway authenticates every request and forwards the
//! validated identity in `x-user-id`, `x-user-email` and `x-user-role`
//! headers. Requests reaching this service without those headers have
//! bypassed the gateway and are rejected as unauthenticated.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Roles recognised by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Doctor,
    Admin,
    Patient,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOCTOR" => Some(Role::Doctor),
            "ADMIN" => Some(Role::Admin),
            "PATIENT" => Some(Role::Patient),
            _ => None,
        }
    }
}

/// The authenticated caller, as attested by the gateway.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

impl CallerIdentity {
    /// Guard an endpoint behind a role. Mismatch reads as 403.
    pub fn require_role(&self, role: Role) -> Result<(), AuthError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Rejection for missing or malformed identity headers.
#[derive(Debug)]
pub enum AuthError {
    MissingIdentity,
    UnknownRole,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingIdentity => {
                (StatusCode::UNAUTHORIZED, "missing caller identity headers")
            }
            AuthError::UnknownRole => (StatusCode::UNAUTHORIZED, "unrecognised caller role"),
            AuthError::Forbidden => {
                (StatusCode::FORBIDDEN, "caller role not permitted for this endpoint")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_id = header("x-user-id").ok_or(AuthError::MissingIdentity)?.to_string();
        let role = header("x-user-role")
            .ok_or(AuthError::MissingIdentity)
            .and_then(|r| Role::parse(r).ok_or(AuthError::UnknownRole))?;
        let email = header("x-user-email").map(str::to_string);

        Ok(CallerIdentity {
            user_id,
            email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<CallerIdentity, AuthError> {
        let (mut parts, _) = request.into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_identity_from_headers() {
        let request = Request::builder()
            .header("x-user-id", "u-1")
            .header("x-user-role", "doctor")
            .header("x-user-email", "ada@clinic.test")
            .body(())
            .unwrap();

        let identity = extract(request).await.unwrap();
        assert_eq!(identity.user_id, "u-1");
        assert_eq!(identity.role, Role::Doctor);
        assert_eq!(identity.email.as_deref(), Some("ada@clinic.test"));
    }

    #[tokio::test]
    async fn test_missing_headers_are_unauthenticated() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AuthError::MissingIdentity)));

        let no_role = Request::builder()
            .header("x-user-id", "u-1")
            .body(())
            .unwrap();
        assert!(matches!(extract(no_role).await, Err(AuthError::MissingIdentity)));
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let request = Request::builder()
            .header("x-user-id", "u-1")
            .header("x-user-role", "WIZARD")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(AuthError::UnknownRole)));
    }

    #[tokio::test]
    async fn test_role_guard() {
        let request = Request::builder()
            .header("x-user-id", "u-1")
            .header("x-user-role", "ADMIN")
            .body(())
            .unwrap();
        let identity = extract(request).await.unwrap();

        assert!(identity.require_role(Role::Admin).is_ok());
        assert!(matches!(
            identity.require_role(Role::Doctor),
            Err(AuthError::Forbidden)
        ));
    }
}
