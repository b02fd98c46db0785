use std::sync::Arc;

use serde::Serialize;

use crate::error::{ApiError, Resource};
use crate::store::{Datastore, Role, StoreError};

/// Role plus the users currently holding it; the `?usr` listing variant.
#[derive(Debug, Serialize)]
pub struct RoleWithUsers {
    pub id: i64,
    pub name: String,
    pub users: Vec<RoleUserRef>,
}

#[derive(Debug, Serialize)]
pub struct RoleUserRef {
    pub id: i64,
    pub name: String,
    pub email: String,
}

pub struct RoleClient {
    store: Arc<dyn Datastore>,
}

impl RoleClient {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<Vec<Role>, ApiError> {
        Ok(self.store.roles().await?)
    }

    pub async fn all_with_users(&self) -> Result<Vec<RoleWithUsers>, ApiError> {
        let roles = self.store.roles().await?;
        let mut views = Vec::with_capacity(roles.len());
        for role in roles {
            views.push(self.with_users(role).await?);
        }
        Ok(views)
    }

    /// May produce: NotFound.
    pub async fn select(&self, id: i64) -> Result<Role, ApiError> {
        self.store.role(id).await?.ok_or(ApiError::not_found(Resource::Role))
    }

    /// May produce: NotFound.
    pub async fn select_with_users(&self, id: i64) -> Result<RoleWithUsers, ApiError> {
        let role = self.select(id).await?;
        self.with_users(role).await
    }

    pub async fn create(&self, name: &str) -> Result<Role, ApiError> {
        let role = self.store.insert_role(name).await?;
        tracing::debug!("created role {}", role.id);
        Ok(role)
    }

    /// May produce: NotFound.
    pub async fn update(&self, id: i64, name: &str) -> Result<Role, ApiError> {
        self.store
            .update_role(id, name)
            .await?
            .ok_or(ApiError::not_found(Resource::Role))
    }

    /// A role still held by users cannot be removed. May produce:
    /// BadRequest, NotFound.
    pub async fn remove(&self, id: i64) -> Result<Role, ApiError> {
        match self.store.delete_role(id).await {
            Ok(Some(role)) => Ok(role),
            Ok(None) => Err(ApiError::not_found(Resource::Role)),
            Err(StoreError::ForeignKeyViolation(_)) => {
                Err(ApiError::bad_request("Role is assigned to users, cannot remove"))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn with_users(&self, role: Role) -> Result<RoleWithUsers, ApiError> {
        let users = self
            .store
            .users_for_role(role.id)
            .await?
            .into_iter()
            .map(|u| RoleUserRef { id: u.id, name: u.name, email: u.email })
            .collect();
        Ok(RoleWithUsers { id: role.id, name: role.name, users })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewUser};

    #[tokio::test]
    async fn held_role_cannot_be_removed() {
        let store = Arc::new(MemoryStore::new());
        let role = store.insert_role("user").await.unwrap();
        store
            .insert_user(NewUser {
                name: "holder".into(),
                email: "h@app.com".into(),
                password: "x".into(),
                role_id: role.id,
                profile_img: String::new(),
            })
            .await
            .unwrap();

        let client = RoleClient::new(store.clone());
        let err = client.remove(role.id).await.unwrap_err();
        match err {
            ApiError::BadRequest(msg) => {
                assert_eq!(msg, "Role is assigned to users, cannot remove")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(store.role(role.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unheld_role_is_removed() {
        let store = Arc::new(MemoryStore::new());
        let role = store.insert_role("ghost").await.unwrap();
        let client = RoleClient::new(store.clone());
        let removed = client.remove(role.id).await.unwrap();
        assert_eq!(removed.id, role.id);
        assert!(store.role(role.id).await.unwrap().is_none());
    }
}
