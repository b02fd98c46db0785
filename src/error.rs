// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::store::StoreError;

/// A single field-level validation failure, reported back to the client
/// inside a 400 "Invalid request body" response.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub param: &'static str,
    pub msg: String,
    pub value: Value,
}

impl FieldError {
    pub fn new(param: &'static str, msg: impl Into<String>, value: Value) -> Self {
        Self { param, msg: msg.into(), value }
    }
}

/// Resources that can go missing. Rendered as "No such <resource> exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Role,
    User,
    Tag,
    Idea,
    Comment,
    Like,
    Avatar,
}

impl Resource {
    fn as_str(&self) -> &'static str {
        match self {
            Resource::Role => "role",
            Resource::User => "user",
            Resource::Tag => "tag",
            Resource::Idea => "idea",
            Resource::Comment => "comment",
            Resource::Like => "like",
            Resource::Avatar => "avatar",
        }
    }
}

/// API error with appropriate status codes and client-safe messages.
///
/// This is a closed set: every entity client method declares exactly which
/// of these it may produce. Internal detail (store errors, programming
/// errors) is logged server-side and never leaves the process.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request - business rule violation with a human-readable message
    BadRequest(String),
    // 400 Bad Request - declarative body validation failed
    Validation(Vec<FieldError>),
    // 401 Unauthorized - token missing/invalid/expired or subject unresolvable
    Unauthorized,
    // 403 Forbidden - authorization predicate denied; carries no resource detail
    Forbidden,
    // 404 Not Found
    NotFound(Resource),
    // 500 Internal Server Error - generic body, detail already logged
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(resource: Resource) -> Self {
        ApiError::NotFound(resource)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Validation(_) => 400,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Internal => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Validation(_) => "Invalid request body".to_string(),
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
            ApiError::NotFound(resource) => format!("No such {} exists", resource.as_str()),
            ApiError::Internal => "Internal server error".to_string(),
        }
    }

    /// Convert to the JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({
                "status": self.status_code(),
                "msg": self.message(),
                "errors": errors,
            }),
            _ => json!({
                "status": self.status_code(),
                "msg": self.message(),
            }),
        }
    }
}

// Store failures that no entity client claimed as a business rule are
// unclassified: log the detail, return the fixed generic body.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("unhandled store error: {}", err);
        ApiError::Internal
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
