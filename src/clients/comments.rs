use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{user_ref, IdeaRef, UserRef};
use crate::auth::policy::OwnershipPredicate;
use crate::error::{ApiError, Resource};
use crate::store::{Comment, Datastore, NewComment, StoreError, User};

/// Public comment shape: the row plus its author and the idea it sits on.
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub user: UserRef,
    pub idea: IdeaRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct CommentClient {
    store: Arc<dyn Datastore>,
}

impl CommentClient {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<Vec<CommentView>, ApiError> {
        let rows = self.store.comments().await?;
        let mut views = Vec::with_capacity(rows.len());
        for comment in rows {
            views.push(self.view(comment).await?);
        }
        Ok(views)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<CommentView, ApiError> {
        let comment = self
            .store
            .comment(id)
            .await?
            .ok_or(ApiError::not_found(Resource::Comment))?;
        self.view(comment).await
    }

    /// All comments on one idea. May produce: NotFound (no such idea).
    pub async fn for_idea(&self, idea_id: i64) -> Result<Vec<CommentView>, ApiError> {
        if self.store.idea(idea_id).await?.is_none() {
            return Err(ApiError::not_found(Resource::Idea));
        }
        let rows = self.store.comments_for_idea(idea_id).await?;
        let mut views = Vec::with_capacity(rows.len());
        for comment in rows {
            views.push(self.view(comment).await?);
        }
        Ok(views)
    }

    /// Comment on an idea as `author`. May produce: BadRequest (no such
    /// idea).
    pub async fn create(
        &self,
        content: &str,
        idea_id: i64,
        author: &User,
    ) -> Result<CommentView, ApiError> {
        let comment = self
            .store
            .insert_comment(NewComment {
                content: content.to_string(),
                idea_id,
                user_id: author.id,
            })
            .await
            .map_err(|err| match err {
                StoreError::ForeignKeyViolation(_) => {
                    ApiError::bad_request("Unable to comment this idea")
                }
                other => other.into(),
            })?;
        tracing::debug!("user {} commented idea {}", author.id, idea_id);
        self.view(comment).await
    }

    /// May produce: NotFound.
    pub async fn update(&self, id: i64, content: &str) -> Result<CommentView, ApiError> {
        let comment = self
            .store
            .update_comment(id, content)
            .await?
            .ok_or(ApiError::not_found(Resource::Comment))?;
        self.view(comment).await
    }

    /// May produce: NotFound.
    pub async fn remove(&self, id: i64) -> Result<CommentView, ApiError> {
        let comment = self
            .store
            .comment(id)
            .await?
            .ok_or(ApiError::not_found(Resource::Comment))?;
        let view = self.view(comment).await?;
        self.store.delete_comment(id).await?;
        Ok(view)
    }

    /// May produce: NotFound (target comment does not exist).
    pub async fn user_owns(&self, user: &User, comment_id: i64) -> Result<bool, ApiError> {
        match self.store.comment(comment_id).await? {
            Some(comment) => Ok(comment.user_id == user.id),
            None => Err(ApiError::not_found(Resource::Comment)),
        }
    }

    async fn view(&self, comment: Comment) -> Result<CommentView, ApiError> {
        let user = user_ref(self.store.as_ref(), comment.user_id).await?;
        let idea = match self.store.idea(comment.idea_id).await? {
            Some(idea) => IdeaRef { id: idea.id, user_id: idea.user_id },
            None => {
                tracing::error!("dangling idea_id {} on comment {}", comment.idea_id, comment.id);
                return Err(ApiError::Internal);
            }
        };
        Ok(CommentView {
            id: comment.id,
            content: comment.content,
            user,
            idea,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }
}

#[async_trait]
impl OwnershipPredicate for CommentClient {
    async fn user_owns(&self, user: &User, resource_id: i64) -> Result<bool, ApiError> {
        CommentClient::user_owns(self, user, resource_id).await
    }
}
