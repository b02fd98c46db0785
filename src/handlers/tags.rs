use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;

use super::roles::WithUsersQuery;
use crate::auth::policy::{authorize, DenyAll};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{validate_tag, TagBody};

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<WithUsersQuery>,
) -> Result<Response, ApiError> {
    let tags = state.tags();
    if query.usr.is_some() {
        Ok(Json(tags.all_with_users().await?).into_response())
    } else {
        Ok(Json(tags.all().await?).into_response())
    }
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<WithUsersQuery>,
) -> Result<Response, ApiError> {
    let tags = state.tags();
    if query.usr.is_some() {
        Ok(Json(tags.select_with_users(id).await?).into_response())
    } else {
        Ok(Json(tags.select(id).await?).into_response())
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(mut body): Json<TagBody>,
) -> Result<Response, ApiError> {
    validate_tag(&mut body)?;
    authorize(&state.config, Some(&caller), 0, &DenyAll).await?;
    let tag = state
        .tags()
        .create(&body.name, body.description.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(tag).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(mut body): Json<TagBody>,
) -> Result<Response, ApiError> {
    validate_tag(&mut body)?;
    authorize(&state.config, Some(&caller), id, &DenyAll).await?;
    let tag = state.tags().update(id, Some(body.name), body.description).await?;
    Ok(Json(tag).into_response())
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    authorize(&state.config, Some(&caller), id, &DenyAll).await?;
    Ok(Json(state.tags().remove(id).await?).into_response())
}

/// POST /tags/:id/user/:user_id. Gated by the user-ownership predicate on
/// the target user: people subscribe themselves, admins subscribe anyone.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((tag_id, user_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    authorize(&state.config, Some(&caller), user_id, &state.users()).await?;
    state.tags().add_user_to_tag(tag_id, user_id).await?;
    Ok(Json(json!({"msg": "User subscribed to tag"})).into_response())
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path((tag_id, user_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    authorize(&state.config, Some(&caller), user_id, &state.users()).await?;
    state.tags().remove_user_from_tag(tag_id, user_id).await?;
    Ok(Json(json!({"msg": "User unsubscribed from tag"})).into_response())
}
