//! Entity clients: thin wrappers over the persistence gateway, one per
//! entity, carrying the business rules (existence checks, relation
//! management, field shaping). Constructed per use from `AppState`; each
//! holds a shared handle to the gateway and nothing else mutable.

pub mod comments;
pub mod ideas;
pub mod likes;
pub mod roles;
pub mod tags;
pub mod users;

use serde::Serialize;

use crate::error::ApiError;
use crate::store::Datastore;

pub use comments::CommentClient;
pub use ideas::IdeaClient;
pub use likes::LikeClient;
pub use roles::RoleClient;
pub use tags::TagClient;
pub use users::UserClient;

/// Minimal user shape embedded in other entities' public views.
#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

/// Minimal idea shape embedded in comment/like views.
#[derive(Debug, Clone, Serialize)]
pub struct IdeaRef {
    pub id: i64,
    pub user_id: i64,
}

/// Resolve the owning user of a row into a `UserRef`. A dangling id means
/// the store broke referential integrity, which is an internal failure.
pub(crate) async fn user_ref(store: &dyn Datastore, user_id: i64) -> Result<UserRef, ApiError> {
    match store.user(user_id).await? {
        Some(user) => Ok(UserRef { id: user.id, name: user.name }),
        None => {
            tracing::error!("dangling user_id {} in stored row", user_id);
            Err(ApiError::Internal)
        }
    }
}
