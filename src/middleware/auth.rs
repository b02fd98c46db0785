use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::User;

/// The authenticated caller, resolved from the bearer token's subject and
/// inserted as a request extension by [`require_auth`]. The row is looked
/// up fresh on every request, so role changes and deletions take effect
/// immediately regardless of what the token says.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authentication gate for the protected route group. A missing header,
/// malformed or expired token, or a subject that no longer exists all
/// produce the same 401.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let claims = auth::verify_token(token, &state.config.security)?;
    let user = state
        .store
        .user(claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.trim().is_empty())
}
