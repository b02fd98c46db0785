use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::auth::policy::authorize;
use crate::clients::likes::IdeaLikes;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::store::Like;
use crate::validation::{validate_like, LikeBody};

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Like>>, ApiError> {
    Ok(Json(state.likes().all().await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Like>, ApiError> {
    Ok(Json(state.likes().select(id).await?))
}

pub async fn for_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<i64>,
) -> Result<Json<IdeaLikes>, ApiError> {
    Ok(Json(state.likes().for_idea(idea_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(body): Json<LikeBody>,
) -> Result<Json<Like>, ApiError> {
    validate_like(&body)?;
    Ok(Json(state.likes().create(body.idea_id, &caller).await?))
}

/// POST /likes/idea/:id — like the idea in the path as the caller.
pub async fn like_idea(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(idea_id): Path<i64>,
) -> Result<Json<Like>, ApiError> {
    Ok(Json(state.likes().create_for_idea(idea_id, &caller).await?))
}

/// DELETE /likes/idea/:id — withdraw the caller's like. No authorize()
/// step: the (idea, caller) pair already scopes the row to its owner.
pub async fn dislike_idea(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(idea_id): Path<i64>,
) -> Result<Json<Like>, ApiError> {
    Ok(Json(state.likes().remove_from_idea(idea_id, &caller).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Like>, ApiError> {
    let likes = state.likes();
    authorize(&state.config, Some(&caller), id, &likes).await?;
    Ok(Json(likes.remove(id).await?))
}
