use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{user_ref, UserRef};
use crate::auth::policy::OwnershipPredicate;
use crate::error::{ApiError, Resource};
use crate::store::{
    Datastore, Idea, IdeaPatch, IdeaQuery, IdeaSort, NewIdea, SortDirection, StoreError, User,
};

/// Public idea shape: the row plus its owner, tags, comments and likes.
#[derive(Debug, Serialize)]
pub struct IdeaView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user: UserRef,
    pub tags: Vec<IdeaTagRef>,
    pub comments: Vec<IdeaCommentRef>,
    pub likes: Vec<IdeaLikeRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IdeaTagRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct IdeaCommentRef {
    pub id: i64,
    pub content: String,
    pub user: UserRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct IdeaLikeRef {
    pub user_id: i64,
}

pub struct IdeaClient {
    store: Arc<dyn Datastore>,
}

impl IdeaClient {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// List ideas: fixed page size, optional "has at least one of these
    /// tags" filter, optional sort over a closed key set. An unrecognized
    /// sort key is ignored; an unrecognized direction falls back to desc.
    pub async fn all(
        &self,
        page: i64,
        tag_ids: Vec<i64>,
        sort: Option<&str>,
        direction: Option<&str>,
        per_page: i64,
    ) -> Result<Vec<IdeaView>, ApiError> {
        let sort = match sort {
            Some("likes") => Some(IdeaSort::Likes),
            Some("comments") => Some(IdeaSort::Comments),
            Some("date") => Some(IdeaSort::Date),
            _ => None,
        };
        let direction = match direction {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        let rows = self
            .store
            .ideas(IdeaQuery { page, per_page, tag_ids, sort, direction })
            .await?;
        let mut views = Vec::with_capacity(rows.len());
        for idea in rows {
            views.push(self.view(idea).await?);
        }
        Ok(views)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<IdeaView, ApiError> {
        let idea =
            self.store.idea(id).await?.ok_or(ApiError::not_found(Resource::Idea))?;
        self.view(idea).await
    }

    /// Create an idea owned by `owner`. Every referenced tag id must exist;
    /// any miss rejects the whole write. May produce: BadRequest.
    pub async fn create(
        &self,
        title: &str,
        content: &str,
        tag_ids: &[i64],
        owner: &User,
    ) -> Result<IdeaView, ApiError> {
        self.ensure_tags_exist(tag_ids, "No tag exists with that id, cant create idea")
            .await?;
        let idea = self
            .store
            .insert_idea(NewIdea {
                title: title.to_string(),
                content: content.to_string(),
                user_id: owner.id,
            })
            .await?;
        // Validated above; a failure here is a tag deleted in between.
        if let Err(err) = self.store.link_idea_tags(idea.id, tag_ids).await {
            return Err(match err {
                StoreError::ForeignKeyViolation(_) => {
                    ApiError::bad_request("No tag exists with that id, cant create idea")
                }
                other => other.into(),
            });
        }
        tracing::info!("created idea {} for user {}", idea.id, owner.id);
        self.view(idea).await
    }

    /// Update title/content and relink tags. Tags are mandatory on every
    /// update; all ids are validated before anything is touched, so a bad
    /// id leaves the existing associations unchanged. May produce:
    /// BadRequest.
    pub async fn update(
        &self,
        id: i64,
        title: &str,
        content: &str,
        tags: Option<&[i64]>,
    ) -> Result<IdeaView, ApiError> {
        let tag_ids = tags.ok_or_else(|| ApiError::bad_request("Tags not sent"))?;
        self.ensure_tags_exist(tag_ids, "One or more of the tags do not exist, cannot update idea")
            .await?;

        let relinked = match self.store.relink_idea_tags(id, tag_ids).await {
            Ok(done) => done,
            // A tag vanished between validation and relink; indistinguishable
            // from a concurrent idea delete at this point.
            Err(StoreError::ForeignKeyViolation(_)) => false,
            Err(other) => return Err(other.into()),
        };
        if !relinked {
            return Err(ApiError::bad_request("Idea does not exist, cannot update"));
        }

        let idea = self
            .store
            .update_idea(id, IdeaPatch { title: title.to_string(), content: content.to_string() })
            .await?
            .ok_or_else(|| ApiError::bad_request("Idea does not exist, cannot update"))?;
        self.view(idea).await
    }

    /// May produce: NotFound.
    pub async fn remove(&self, id: i64) -> Result<IdeaView, ApiError> {
        let idea =
            self.store.idea(id).await?.ok_or(ApiError::not_found(Resource::Idea))?;
        // Snapshot the full view before the cascade empties the relations.
        let view = self.view(idea).await?;
        self.store.delete_idea(id).await?;
        Ok(view)
    }

    /// May produce: NotFound (target idea does not exist).
    pub async fn user_owns(&self, user: &User, idea_id: i64) -> Result<bool, ApiError> {
        match self.store.idea(idea_id).await? {
            Some(idea) => Ok(idea.user_id == user.id),
            None => Err(ApiError::not_found(Resource::Idea)),
        }
    }

    async fn ensure_tags_exist(&self, tag_ids: &[i64], msg: &str) -> Result<(), ApiError> {
        let resolved = self.store.tags_by_ids(tag_ids).await?;
        if resolved.len() != tag_ids.len() {
            return Err(ApiError::bad_request(msg));
        }
        Ok(())
    }

    async fn view(&self, idea: Idea) -> Result<IdeaView, ApiError> {
        let user = user_ref(self.store.as_ref(), idea.user_id).await?;
        let tags = self
            .store
            .idea_tags(idea.id)
            .await?
            .into_iter()
            .map(|t| IdeaTagRef { id: t.id, name: t.name })
            .collect();
        let mut comments = Vec::new();
        for comment in self.store.comments_for_idea(idea.id).await? {
            comments.push(IdeaCommentRef {
                id: comment.id,
                content: comment.content,
                user: user_ref(self.store.as_ref(), comment.user_id).await?,
                created_at: comment.created_at,
            });
        }
        let likes = self
            .store
            .likes_for_idea(idea.id)
            .await?
            .into_iter()
            .map(|l| IdeaLikeRef { user_id: l.user_id })
            .collect();
        Ok(IdeaView {
            id: idea.id,
            title: idea.title,
            content: idea.content,
            user,
            tags,
            comments,
            likes,
            created_at: idea.created_at,
        })
    }
}

#[async_trait]
impl OwnershipPredicate for IdeaClient {
    async fn user_owns(&self, user: &User, resource_id: i64) -> Result<bool, ApiError> {
        IdeaClient::user_owns(self, user, resource_id).await
    }
}
