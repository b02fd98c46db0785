use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::auth::policy::authorize;
use crate::clients::users::{CreateUser, PublicUser, UpdateUser};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{
    validate_user, validate_user_update, AvatarBody, UserBody, UserUpdateBody,
};

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    Ok(Json(state.users().all().await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.users().select(id).await?))
}

/// Signup; the only unauthenticated write in the API.
pub async fn create(
    State(state): State<AppState>,
    Json(mut body): Json<UserBody>,
) -> Result<Json<PublicUser>, ApiError> {
    validate_user(&mut body)?;
    let user = state
        .users()
        .create(CreateUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role_id: body.role_id,
            profile_img: String::new(),
        })
        .await?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(mut body): Json<UserUpdateBody>,
) -> Result<Json<PublicUser>, ApiError> {
    validate_user_update(&mut body)?;
    let users = state.users();
    authorize(&state.config, Some(&caller), id, &users).await?;
    let user = users
        .update(
            UpdateUser {
                name: body.name,
                email: body.email,
                password: body.password,
                role_id: body.role_id,
            },
            id,
        )
        .await?;
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    let users = state.users();
    authorize(&state.config, Some(&caller), id, &users).await?;
    Ok(Json(users.remove(id).await?))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<AvatarBody>,
) -> Result<Json<PublicUser>, ApiError> {
    let users = state.users();
    authorize(&state.config, Some(&caller), id, &users).await?;
    Ok(Json(users.update_avatar(id, &body.profile_img).await?))
}

pub async fn remove_avatar(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    let users = state.users();
    authorize(&state.config, Some(&caller), id, &users).await?;
    Ok(Json(users.remove_avatar(id).await?))
}
