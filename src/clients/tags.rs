use std::sync::Arc;

use serde::Serialize;

use crate::error::{ApiError, Resource};
use crate::store::{Datastore, NewTag, StoreError, Tag, TagPatch};

/// Tag plus its subscribers; the `?usr` listing variant.
#[derive(Debug, Serialize)]
pub struct TagWithUsers {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub users: Vec<TagUserRef>,
}

#[derive(Debug, Serialize)]
pub struct TagUserRef {
    pub id: i64,
    pub name: String,
    pub email: String,
}

pub struct TagClient {
    store: Arc<dyn Datastore>,
}

impl TagClient {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<Vec<Tag>, ApiError> {
        Ok(self.store.tags().await?)
    }

    pub async fn all_with_users(&self) -> Result<Vec<TagWithUsers>, ApiError> {
        let tags = self.store.tags().await?;
        let mut views = Vec::with_capacity(tags.len());
        for tag in tags {
            views.push(self.with_users(tag).await?);
        }
        Ok(views)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<Tag, ApiError> {
        self.store.tag(id).await?.ok_or(ApiError::not_found(Resource::Tag))
    }

    /// May produce: NotFound.
    pub async fn select_with_users(&self, id: i64) -> Result<TagWithUsers, ApiError> {
        let tag = self.select(id).await?;
        self.with_users(tag).await
    }

    /// Tag names are unique. May produce: BadRequest.
    pub async fn create(&self, name: &str, description: &str) -> Result<Tag, ApiError> {
        if !self.tag_is_free(name).await? {
            return Err(ApiError::bad_request("Unable to create tag"));
        }
        let tag = self
            .store
            .insert_tag(NewTag { name: name.to_string(), description: description.to_string() })
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => ApiError::bad_request("Unable to create tag"),
                other => other.into(),
            })?;
        tracing::debug!("created tag {}", tag.id);
        Ok(tag)
    }

    /// May produce: BadRequest (name taken), NotFound.
    pub async fn update(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Tag, ApiError> {
        self.store
            .update_tag(id, TagPatch { name, description })
            .await
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => ApiError::bad_request("Unable to update tag"),
                other => other.into(),
            })?
            .ok_or(ApiError::not_found(Resource::Tag))
    }

    /// May produce: NotFound.
    pub async fn remove(&self, id: i64) -> Result<Tag, ApiError> {
        self.store.delete_tag(id).await?.ok_or(ApiError::not_found(Resource::Tag))
    }

    pub async fn tag_is_free(&self, name: &str) -> Result<bool, ApiError> {
        Ok(self.store.tag_by_name(name).await?.is_none())
    }

    /// Subscribe a user to a tag. Both sides must exist and the pair must
    /// be new. May produce: BadRequest.
    pub async fn add_user_to_tag(&self, tag_id: i64, user_id: i64) -> Result<(), ApiError> {
        match self.store.insert_subscription(tag_id, user_id).await {
            Ok(()) => Ok(()),
            Err(StoreError::UniqueViolation(_)) => {
                Err(ApiError::bad_request("User is already subscribed to this tag"))
            }
            Err(StoreError::ForeignKeyViolation(constraint)) => {
                // The violated constraint names which side is missing.
                if constraint.contains("user") {
                    Err(ApiError::bad_request(format!("User {} does not exist.", user_id)))
                } else {
                    Err(ApiError::bad_request(format!("Tag {} does not exist.", tag_id)))
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    /// May produce: BadRequest (no such subscription).
    pub async fn remove_user_from_tag(&self, tag_id: i64, user_id: i64) -> Result<(), ApiError> {
        if !self.store.delete_subscription(tag_id, user_id).await? {
            return Err(ApiError::bad_request("User is not subscribed to this tag"));
        }
        Ok(())
    }

    async fn with_users(&self, tag: Tag) -> Result<TagWithUsers, ApiError> {
        let users = self
            .store
            .subscribers(tag.id)
            .await?
            .into_iter()
            .map(|u| TagUserRef { id: u.id, name: u.name, email: u.email })
            .collect();
        Ok(TagWithUsers { id: tag.id, name: tag.name, description: tag.description, users })
    }
}
