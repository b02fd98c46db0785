use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::auth::policy::OwnershipPredicate;
use crate::error::{ApiError, Resource};
use crate::store::{Datastore, Like, StoreError, User};

/// Likes of one idea plus the running total.
#[derive(Debug, Serialize)]
pub struct IdeaLikes {
    pub likes: Vec<Like>,
    pub count: usize,
}

pub struct LikeClient {
    store: Arc<dyn Datastore>,
}

impl LikeClient {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<Vec<Like>, ApiError> {
        Ok(self.store.likes().await?)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<Like, ApiError> {
        self.store.like(id).await?.ok_or(ApiError::not_found(Resource::Like))
    }

    /// All likes of an idea with a count. May produce: NotFound (no such
    /// idea).
    pub async fn for_idea(&self, idea_id: i64) -> Result<IdeaLikes, ApiError> {
        if self.store.idea(idea_id).await?.is_none() {
            return Err(ApiError::not_found(Resource::Idea));
        }
        let likes = self.store.likes_for_idea(idea_id).await?;
        let count = likes.len();
        Ok(IdeaLikes { likes, count })
    }

    /// Like an idea as `user`. One like per (idea, user); a repeat or a
    /// missing idea both reject. May produce: BadRequest.
    pub async fn create(&self, idea_id: i64, user: &User) -> Result<Like, ApiError> {
        match self.store.insert_like(idea_id, user.id).await {
            Ok(like) => {
                tracing::debug!("user {} liked idea {}", user.id, idea_id);
                Ok(like)
            }
            Err(StoreError::UniqueViolation(_)) | Err(StoreError::ForeignKeyViolation(_)) => {
                Err(ApiError::bad_request("Unable to like this idea"))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Path-parameter variant of [`Self::create`]; same rules.
    pub async fn create_for_idea(&self, idea_id: i64, user: &User) -> Result<Like, ApiError> {
        self.create(idea_id, user).await
    }

    /// May produce: NotFound.
    pub async fn remove(&self, id: i64) -> Result<Like, ApiError> {
        self.store.delete_like(id).await?.ok_or(ApiError::not_found(Resource::Like))
    }

    /// Withdraw `user`'s like from an idea. May produce: BadRequest (the
    /// user never liked it).
    pub async fn remove_from_idea(&self, idea_id: i64, user: &User) -> Result<Like, ApiError> {
        self.store
            .delete_like_by_pair(idea_id, user.id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Unable to dislike this idea"))
    }

    /// May produce: NotFound (target like does not exist).
    pub async fn user_owns(&self, user: &User, like_id: i64) -> Result<bool, ApiError> {
        match self.store.like(like_id).await? {
            Some(like) => Ok(like.user_id == user.id),
            None => Err(ApiError::not_found(Resource::Like)),
        }
    }
}

#[async_trait]
impl OwnershipPredicate for LikeClient {
    async fn user_owns(&self, user: &User, resource_id: i64) -> Result<bool, ApiError> {
        LikeClient::user_owns(self, user, resource_id).await
    }
}
