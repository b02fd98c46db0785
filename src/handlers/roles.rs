use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;

use crate::auth::policy::{authorize, DenyAll};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{validate_role, RoleBody};

/// `?usr` switches the listing to the variant that embeds the users
/// holding each role.
#[derive(Debug, Default, Deserialize)]
pub struct WithUsersQuery {
    pub usr: Option<String>,
}

impl WithUsersQuery {
    fn wants_users(&self) -> bool {
        self.usr.is_some()
    }
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<WithUsersQuery>,
) -> Result<Response, ApiError> {
    let roles = state.roles();
    if query.wants_users() {
        Ok(Json(roles.all_with_users().await?).into_response())
    } else {
        Ok(Json(roles.all().await?).into_response())
    }
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<WithUsersQuery>,
) -> Result<Response, ApiError> {
    let roles = state.roles();
    if query.wants_users() {
        Ok(Json(roles.select_with_users(id).await?).into_response())
    } else {
        Ok(Json(roles.select(id).await?).into_response())
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(mut body): Json<RoleBody>,
) -> Result<Response, ApiError> {
    validate_role(&mut body)?;
    authorize(&state.config, Some(&caller), 0, &DenyAll).await?;
    Ok(Json(state.roles().create(&body.name).await?).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(mut body): Json<RoleBody>,
) -> Result<Response, ApiError> {
    validate_role(&mut body)?;
    authorize(&state.config, Some(&caller), id, &DenyAll).await?;
    Ok(Json(state.roles().update(id, &body.name).await?).into_response())
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    authorize(&state.config, Some(&caller), id, &DenyAll).await?;
    Ok(Json(state.roles().remove(id).await?).into_response())
}
