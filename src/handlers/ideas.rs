use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use crate::auth::policy::authorize;
use crate::clients::ideas::IdeaView;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{validate_idea, IdeaBody};

/// GET /ideas query string: zero-based page, comma-separated tag ids,
/// sort key and direction. Unparseable tag ids are dropped.
#[derive(Debug, Default, Deserialize)]
pub struct IdeasQuery {
    pub page_num: Option<i64>,
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IdeasQuery>,
) -> Result<Json<Vec<IdeaView>>, ApiError> {
    let tag_ids: Vec<i64> = query
        .tags
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    let views = state
        .ideas()
        .all(
            query.page_num.unwrap_or(0).max(0),
            tag_ids,
            query.sort.as_deref(),
            query.dir.as_deref(),
            state.config.api.ideas_per_page,
        )
        .await?;
    Ok(Json(views))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<IdeaView>, ApiError> {
    Ok(Json(state.ideas().select(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Json(mut body): Json<IdeaBody>,
) -> Result<Json<IdeaView>, ApiError> {
    validate_idea(&mut body)?;
    // validate_idea guarantees tags is a non-empty array
    let tags = body.tags.unwrap_or_default();
    let idea = state.ideas().create(&body.title, &body.content, &tags, &caller).await?;
    Ok(Json(idea))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(mut body): Json<IdeaBody>,
) -> Result<Json<IdeaView>, ApiError> {
    validate_idea(&mut body)?;
    let ideas = state.ideas();
    authorize(&state.config, Some(&caller), id, &ideas).await?;
    let idea = ideas.update(id, &body.title, &body.content, body.tags.as_deref()).await?;
    Ok(Json(idea))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<IdeaView>, ApiError> {
    let ideas = state.ideas();
    authorize(&state.config, Some(&caller), id, &ideas).await?;
    Ok(Json(ideas.remove(id).await?))
}
