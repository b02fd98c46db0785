use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth;
use crate::auth::policy::OwnershipPredicate;
use crate::config::SecurityConfig;
use crate::error::{ApiError, Resource};
use crate::storage::AvatarStore;
use crate::store::{Datastore, NewUser, StoreError, User, UserPatch};

/// Public user shape: everything except the password hash, enriched with
/// the role and the user's ideas, comments and liked idea ids.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_img: String,
    pub role: RoleRef,
    pub created_at: DateTime<Utc>,
    pub ideas: Vec<OwnIdeaRef>,
    pub comments: Vec<OwnCommentRef>,
    pub likes: Vec<OwnLikeRef>,
}

#[derive(Debug, Serialize)]
pub struct RoleRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct OwnIdeaRef {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OwnCommentRef {
    pub id: i64,
    pub content: String,
    pub idea_id: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OwnLikeRef {
    pub idea_id: i64,
}

/// Field set for user creation; password arrives in plain text and is
/// hashed here.
#[derive(Debug)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: i64,
    pub profile_img: String,
}

/// Field set for user update; `None` leaves the field alone.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
}

pub struct UserClient {
    store: Arc<dyn Datastore>,
    avatars: AvatarStore,
    security: SecurityConfig,
}

impl UserClient {
    pub fn new(store: Arc<dyn Datastore>, avatars: AvatarStore, security: SecurityConfig) -> Self {
        Self { store, avatars, security }
    }

    pub async fn all(&self) -> Result<Vec<PublicUser>, ApiError> {
        let rows = self.store.users().await?;
        let mut views = Vec::with_capacity(rows.len());
        for user in rows {
            views.push(self.view(user).await?);
        }
        Ok(views)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<PublicUser, ApiError> {
        let user =
            self.store.user(id).await?.ok_or(ApiError::not_found(Resource::User))?;
        self.view(user).await
    }

    /// Raw row including the password hash. Login flow only; never leaves
    /// the process.
    pub async fn select_by_email_with_secret(
        &self,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        Ok(self.store.user_by_email(email).await?)
    }

    /// Signup. The role must exist and the email must be free. May
    /// produce: BadRequest.
    pub async fn create(&self, fields: CreateUser) -> Result<PublicUser, ApiError> {
        self.ensure_role_exists(fields.role_id).await?;
        if self.email_exists(&fields.email).await? {
            return Err(ApiError::bad_request("Email already in use"));
        }
        let hashed = auth::hash_password(&fields.password, &self.security)?;
        let user = self
            .store
            .insert_user(NewUser {
                name: fields.name,
                email: fields.email,
                password: hashed,
                role_id: fields.role_id,
                profile_img: fields.profile_img,
            })
            .await
            .map_err(|err| match err {
                // Advisory check lost a race; the constraint has the final say.
                StoreError::UniqueViolation(_) => ApiError::bad_request("Email already in use"),
                StoreError::ForeignKeyViolation(_) => {
                    ApiError::bad_request("No role exists with that id")
                }
                other => other.into(),
            })?;
        tracing::debug!("created user {}", user.id);
        self.view(user).await
    }

    /// Re-hashes the password whenever a new one is supplied. May produce:
    /// BadRequest, NotFound.
    pub async fn update(&self, fields: UpdateUser, id: i64) -> Result<PublicUser, ApiError> {
        if let Some(role_id) = fields.role_id {
            self.ensure_role_exists(role_id).await?;
        }
        if let Some(email) = &fields.email {
            if !self.email_is_same_or_unique(email, id).await? {
                return Err(ApiError::bad_request("Email already in use"));
            }
        }
        let password = match &fields.password {
            Some(plain) => Some(auth::hash_password(plain, &self.security)?),
            None => None,
        };
        let user = self
            .store
            .update_user(
                id,
                UserPatch {
                    name: fields.name,
                    email: fields.email,
                    password,
                    role_id: fields.role_id,
                    profile_img: None,
                },
            )
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => ApiError::bad_request("Email already in use"),
                StoreError::ForeignKeyViolation(_) => {
                    ApiError::bad_request("No role exists with that id")
                }
                other => other.into(),
            })?
            .ok_or(ApiError::not_found(Resource::User))?;
        self.view(user).await
    }

    /// Delete the user and everything owned by them; the stored avatar
    /// file goes last, best-effort. May produce: NotFound.
    pub async fn remove(&self, id: i64) -> Result<PublicUser, ApiError> {
        let user =
            self.store.user(id).await?.ok_or(ApiError::not_found(Resource::User))?;
        let mut view = self.view(user.clone()).await?;
        self.store.delete_user(id).await?;
        self.avatars.remove(&user.profile_img).await;
        view.profile_img = String::new();
        Ok(view)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        Ok(self.store.user_by_email(email).await?.is_some())
    }

    /// True when the email is free, or already belongs to user `id`.
    pub async fn email_is_same_or_unique(&self, email: &str, id: i64) -> Result<bool, ApiError> {
        match self.store.user_by_email(email).await? {
            None => Ok(true),
            Some(user) => Ok(user.id == id),
        }
    }

    /// Point the user at a new avatar file. The old file is deleted only
    /// after the row update succeeded, and only if the path actually
    /// changed; deletion is best-effort. May produce: NotFound.
    pub async fn update_avatar(&self, id: i64, new_path: &str) -> Result<PublicUser, ApiError> {
        let user =
            self.store.user(id).await?.ok_or(ApiError::not_found(Resource::User))?;
        let old = user.profile_img;
        let updated = self
            .store
            .update_user(
                id,
                UserPatch { profile_img: Some(new_path.to_string()), ..Default::default() },
            )
            .await?
            .ok_or(ApiError::not_found(Resource::User))?;
        if old != new_path {
            self.avatars.remove(&old).await;
        }
        self.view(updated).await
    }

    /// Clear the user's avatar. May produce: NotFound (user, or avatar
    /// when none is set).
    pub async fn remove_avatar(&self, id: i64) -> Result<PublicUser, ApiError> {
        let user =
            self.store.user(id).await?.ok_or(ApiError::not_found(Resource::User))?;
        if user.profile_img.is_empty() {
            return Err(ApiError::not_found(Resource::Avatar));
        }
        let old = user.profile_img;
        let updated = self
            .store
            .update_user(id, UserPatch { profile_img: Some(String::new()), ..Default::default() })
            .await?
            .ok_or(ApiError::not_found(Resource::User))?;
        self.avatars.remove(&old).await;
        self.view(updated).await
    }

    /// Self-service ownership: a user owns exactly their own record. May
    /// produce: NotFound (target user does not exist).
    pub async fn user_owns(&self, user: &User, target_id: i64) -> Result<bool, ApiError> {
        match self.store.user(target_id).await? {
            Some(target) => Ok(target.id == user.id),
            None => Err(ApiError::not_found(Resource::User)),
        }
    }

    async fn ensure_role_exists(&self, role_id: i64) -> Result<(), ApiError> {
        if self.store.role(role_id).await?.is_none() {
            return Err(ApiError::bad_request("No role exists with that id"));
        }
        Ok(())
    }

    pub(crate) async fn view(&self, user: User) -> Result<PublicUser, ApiError> {
        let role = match self.store.role(user.role_id).await? {
            Some(role) => RoleRef { id: role.id, name: role.name },
            None => {
                tracing::error!("dangling role_id {} on user {}", user.role_id, user.id);
                return Err(ApiError::Internal);
            }
        };
        let ideas = self
            .store
            .ideas_for_user(user.id)
            .await?
            .into_iter()
            .map(|i| OwnIdeaRef {
                id: i.id,
                title: i.title,
                content: i.content,
                created_at: i.created_at,
            })
            .collect();
        let comments = self
            .store
            .comments_for_user(user.id)
            .await?
            .into_iter()
            .map(|c| OwnCommentRef {
                id: c.id,
                content: c.content,
                idea_id: c.idea_id,
                updated_at: c.updated_at,
            })
            .collect();
        let likes = self
            .store
            .likes_for_user(user.id)
            .await?
            .into_iter()
            .map(|l| OwnLikeRef { idea_id: l.idea_id })
            .collect();
        Ok(PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
            profile_img: user.profile_img,
            role,
            created_at: user.created_at,
            ideas,
            comments,
            likes,
        })
    }
}

#[async_trait]
impl OwnershipPredicate for UserClient {
    async fn user_owns(&self, user: &User, resource_id: i64) -> Result<bool, ApiError> {
        UserClient::user_owns(self, user, resource_id).await
    }
}
