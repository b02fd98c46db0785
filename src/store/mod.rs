pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

/// Errors surfaced by a datastore. Entity clients match on the constraint
/// variants to turn them into specific business-rule rejections; anything
/// they do not claim becomes a logged 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The persistence gateway. Per-entity find/list/insert/update/delete
/// operations keyed by id, plus the association operations the entity
/// clients need. Single-row reads return `Ok(None)` on a miss; clients
/// decide whether that is a 404.
///
/// Implementations: [`PgStore`] (sqlx/Postgres) and [`MemoryStore`]
/// (tests and local development).
#[async_trait]
pub trait Datastore: Send + Sync {
    // --- roles ---
    async fn role(&self, id: i64) -> Result<Option<Role>, StoreError>;
    async fn roles(&self) -> Result<Vec<Role>, StoreError>;
    async fn insert_role(&self, name: &str) -> Result<Role, StoreError>;
    async fn update_role(&self, id: i64, name: &str) -> Result<Option<Role>, StoreError>;
    /// Fails with `ForeignKeyViolation` while users still hold the role.
    async fn delete_role(&self, id: i64) -> Result<Option<Role>, StoreError>;
    async fn users_for_role(&self, role_id: i64) -> Result<Vec<User>, StoreError>;

    // --- users ---
    async fn user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn users(&self) -> Result<Vec<User>, StoreError>;
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError>;
    /// Removes the user and everything hanging off it (ideas, comments,
    /// likes, subscriptions).
    async fn delete_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    // --- tags ---
    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError>;
    async fn tag_by_name(&self, name: &str) -> Result<Option<Tag>, StoreError>;
    async fn tags(&self) -> Result<Vec<Tag>, StoreError>;
    /// Resolve a set of tag ids; missing ids are simply absent from the
    /// result, callers compare sizes.
    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, StoreError>;
    async fn insert_tag(&self, new: NewTag) -> Result<Tag, StoreError>;
    async fn update_tag(&self, id: i64, patch: TagPatch) -> Result<Option<Tag>, StoreError>;
    async fn delete_tag(&self, id: i64) -> Result<Option<Tag>, StoreError>;

    // --- tag subscriptions (user <-> tag) ---
    /// One row per (tag, user) pair: a duplicate yields `UniqueViolation`,
    /// a missing tag or user yields `ForeignKeyViolation`.
    async fn insert_subscription(&self, tag_id: i64, user_id: i64) -> Result<(), StoreError>;
    /// Returns false when no such subscription existed.
    async fn delete_subscription(&self, tag_id: i64, user_id: i64) -> Result<bool, StoreError>;
    async fn subscribers(&self, tag_id: i64) -> Result<Vec<User>, StoreError>;

    // --- ideas ---
    async fn idea(&self, id: i64) -> Result<Option<Idea>, StoreError>;
    async fn ideas(&self, query: IdeaQuery) -> Result<Vec<Idea>, StoreError>;
    async fn ideas_for_user(&self, user_id: i64) -> Result<Vec<Idea>, StoreError>;
    async fn insert_idea(&self, new: NewIdea) -> Result<Idea, StoreError>;
    async fn update_idea(&self, id: i64, patch: IdeaPatch) -> Result<Option<Idea>, StoreError>;
    async fn delete_idea(&self, id: i64) -> Result<Option<Idea>, StoreError>;

    // --- idea <-> tag associations ---
    async fn idea_tags(&self, idea_id: i64) -> Result<Vec<Tag>, StoreError>;
    /// Attach tags to a fresh idea (no clear step).
    async fn link_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<(), StoreError>;
    /// Clear all existing associations and recreate exactly `tag_ids`, as
    /// one atomic step. Returns false when the idea no longer exists.
    async fn relink_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<bool, StoreError>;

    // --- comments ---
    async fn comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;
    async fn comments(&self) -> Result<Vec<Comment>, StoreError>;
    async fn comments_for_idea(&self, idea_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn comments_for_user(&self, user_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError>;
    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;

    // --- likes ---
    async fn like(&self, id: i64) -> Result<Option<Like>, StoreError>;
    async fn likes(&self) -> Result<Vec<Like>, StoreError>;
    async fn likes_for_idea(&self, idea_id: i64) -> Result<Vec<Like>, StoreError>;
    async fn likes_for_user(&self, user_id: i64) -> Result<Vec<Like>, StoreError>;
    /// At most one like per (idea, user); a duplicate yields
    /// `UniqueViolation`, a missing idea or user `ForeignKeyViolation`.
    async fn insert_like(&self, idea_id: i64, user_id: i64) -> Result<Like, StoreError>;
    async fn delete_like(&self, id: i64) -> Result<Option<Like>, StoreError>;
    async fn delete_like_by_pair(
        &self,
        idea_id: i64,
        user_id: i64,
    ) -> Result<Option<Like>, StoreError>;
}
