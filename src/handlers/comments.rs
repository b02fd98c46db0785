use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::auth::policy::authorize;
use crate::clients::comments::CommentView;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{
    validate_comment, validate_comment_update, CommentBody, CommentUpdateBody,
};

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<CommentView>>, ApiError> {
    Ok(Json(state.comments().all().await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentView>, ApiError> {
    Ok(Json(state.comments().select(id).await?))
}

pub async fn for_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    Ok(Json(state.comments().for_idea(idea_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(mut body): Json<CommentBody>,
) -> Result<Json<CommentView>, ApiError> {
    validate_comment(&mut body)?;
    let comment = state.comments().create(&body.content, body.idea_id, &caller).await?;
    Ok(Json(comment))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(mut body): Json<CommentUpdateBody>,
) -> Result<Json<CommentView>, ApiError> {
    validate_comment_update(&mut body)?;
    let comments = state.comments();
    authorize(&state.config, Some(&caller), id, &comments).await?;
    Ok(Json(comments.update(id, &body.content).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<CommentView>, ApiError> {
    let comments = state.comments();
    authorize(&state.config, Some(&caller), id, &comments).await?;
    Ok(Json(comments.remove(id).await?))
}
