use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// bcrypt hash. Never serialized into a response body.
    #[serde(skip_serializing)]
    pub password: String,
    pub role_id: i64,
    pub profile_img: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Already hashed by the caller.
    pub password: String,
    pub role_id: i64,
    pub profile_img: String,
}

/// Partial user update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
    pub profile_img: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Idea {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIdea {
    pub title: String,
    pub content: String,
    pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct IdeaPatch {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub idea_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub idea_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub id: i64,
    pub idea_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Sort key for idea listings; a closed set, anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaSort {
    Likes,
    Comments,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Listing parameters built by the idea client: fixed page size, optional
/// "has at least one of these tags" filter, optional sort.
#[derive(Debug, Clone)]
pub struct IdeaQuery {
    pub page: i64,
    pub per_page: i64,
    pub tag_ids: Vec<i64>,
    pub sort: Option<IdeaSort>,
    pub direction: SortDirection,
}
