use axum::{
    extract::State,
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::auth::{self, Claims};
use crate::error::{ApiError, Resource};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{validate_login, LoginBody};

/// POST /auth/login. Unknown email is 404; a wrong password is 400 so the
/// two cases stay distinguishable, matching the client app's expectations.
pub async fn login(
    State(state): State<AppState>,
    Json(mut body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    validate_login(&mut body)?;

    let users = state.users();
    let user = users
        .select_by_email_with_secret(&body.email)
        .await?
        .ok_or(ApiError::not_found(Resource::User))?;
    if !auth::verify_password(&body.password, &user.password)? {
        return Err(ApiError::bad_request("Invalid password"));
    }

    let claims = Claims::new(user.id, user.role_id, state.config.security.jwt_expiry_hours);
    let token = auth::issue_token(&claims, &state.config.security)?;
    tracing::info!("user {} logged in", user.id);

    let view = users.view(user).await?;
    Ok(Json(flatten_with_token(view, token)?))
}

/// POST /auth/login/token. Re-issues a token for the already-authenticated
/// caller; the middleware has re-resolved the user row, so a role change
/// is reflected in the fresh claims.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let claims = Claims::new(user.id, user.role_id, state.config.security.jwt_expiry_hours);
    let token = auth::issue_token(&claims, &state.config.security)?;
    let view = state.users().view(user).await?;
    Ok(Json(flatten_with_token(view, token)?))
}

// User payload with the token spliced in at the top level.
fn flatten_with_token(
    view: crate::clients::users::PublicUser,
    token: String,
) -> Result<Value, ApiError> {
    let mut body = serde_json::to_value(&view).map_err(|e| {
        tracing::error!("login payload serialization failed: {}", e);
        ApiError::Internal
    })?;
    body["token"] = json!(token);
    Ok(body)
}
