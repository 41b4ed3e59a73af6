//! Authentication middleware.
//!
//! Validates the bearer credential token on protected routes and injects
//! the authenticated [`UserId`] into request extensions so that downstream
//! handlers can access it. Expired or forged tokens are rejected here;
//! handlers never see an unverified identity.

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::context::AppContext;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Authentication middleware. Applied to protected routes only.
///
/// On success, inserts the resolved [`cv_core::UserId`] into request
/// extensions.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(request.headers());

    let claims = token.and_then(|t| ctx.tokens.verify(&t).ok());

    match claims {
        Some(claims) => {
            request.extensions_mut().insert(claims.sub);
            Ok(next.run(request).await)
        }
        None => Err((StatusCode::UNAUTHORIZED, "Authentication required").into_response()),
    }
}
