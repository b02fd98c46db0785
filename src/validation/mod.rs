//! Declarative request-body checks. Each route payload has a struct and a
//! `validate_*` function that sanitizes in place (trimming, capitalization)
//! and collects `{param, msg, value}` field errors; any error rejects the
//! request with 400 "Invalid request body". Async rules that need the
//! store (role existence, email uniqueness) live in the entity clients.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, FieldError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AvatarBody {
    pub profile_img: String,
}

#[derive(Debug, Deserialize)]
pub struct IdeaBody {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
    pub idea_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdateBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct LikeBody {
    pub idea_id: i64,
}

fn finish(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn check_not_empty(errors: &mut Vec<FieldError>, param: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(FieldError::new(param, "must not be empty", json!(value)));
    }
}

fn check_max(errors: &mut Vec<FieldError>, param: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            param,
            format!("cant be larger than {} characters", max),
            json!(value),
        ));
    }
}

fn check_positive(errors: &mut Vec<FieldError>, param: &'static str, value: i64) {
    if value < 1 {
        errors.push(FieldError::new(param, "must be of positive int type", json!(value)));
    }
}

fn is_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

fn check_email(errors: &mut Vec<FieldError>, param: &'static str, value: &str) {
    if !is_email(value) {
        errors.push(FieldError::new(param, "is not email", json!(value)));
    }
}

/// Minimum length 8, at least one uppercase letter, at least one digit.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
}

fn check_strong_password(errors: &mut Vec<FieldError>, param: &'static str, value: &str) {
    if !is_strong_password(value) {
        errors.push(FieldError::new(
            param,
            "must be at least 8 chars with an uppercase letter and a number",
            Value::Null,
        ));
    }
}

fn valid_name_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, ' ' | ',' | '.' | '\'' | '-')
}

fn check_name(errors: &mut Vec<FieldError>, param: &'static str, value: &str) {
    let len = value.chars().count();
    if !(3..=20).contains(&len) {
        errors.push(FieldError::new(param, "must be 3-20 chars long", json!(value)));
    }
    if !value.chars().all(valid_name_char) {
        errors.push(FieldError::new(param, "must not contain special characters", json!(value)));
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn validate_login(body: &mut LoginBody) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_email(&mut errors, "email", &body.email);
    check_not_empty(&mut errors, "password", &body.password);
    finish(errors)
}

pub fn validate_user(body: &mut UserBody) -> Result<(), ApiError> {
    body.name = body.name.trim().to_string();
    let mut errors = Vec::new();
    check_name(&mut errors, "name", &body.name);
    check_email(&mut errors, "email", &body.email);
    check_strong_password(&mut errors, "password", &body.password);
    check_positive(&mut errors, "role_id", body.role_id);
    finish(errors)
}

pub fn validate_user_update(body: &mut UserUpdateBody) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if let Some(name) = &mut body.name {
        *name = name.trim().to_string();
        check_name(&mut errors, "name", name);
    }
    if let Some(email) = &body.email {
        check_email(&mut errors, "email", email);
    }
    if let Some(password) = &body.password {
        check_strong_password(&mut errors, "password", password);
    }
    if let Some(role_id) = body.role_id {
        check_positive(&mut errors, "role_id", role_id);
    }
    finish(errors)
}

pub fn validate_idea(body: &mut IdeaBody) -> Result<(), ApiError> {
    body.title = body.title.trim().to_string();
    body.content = body.content.trim().to_string();
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "title", &body.title);
    check_max(&mut errors, "title", &body.title, 40);
    check_not_empty(&mut errors, "content", &body.content);
    check_max(&mut errors, "content", &body.content, 1000);
    match &body.tags {
        None => errors.push(FieldError::new("tags", "must be an array", Value::Null)),
        Some(tags) => {
            if tags.is_empty() {
                errors.push(FieldError::new("tags", "must not be empty", json!(tags)));
            }
            for tag in tags {
                if *tag < 1 {
                    errors.push(FieldError::new(
                        "tags.*",
                        "must be of positive int type",
                        json!(tag),
                    ));
                }
            }
        }
    }
    finish(errors)
}

pub fn validate_tag(body: &mut TagBody) -> Result<(), ApiError> {
    body.name = body.name.trim().to_string();
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "name", &body.name);
    check_max(&mut errors, "name", &body.name, 255);
    if let Some(description) = &mut body.description {
        *description = description.trim().to_string();
        check_not_empty(&mut errors, "description", description);
        check_max(&mut errors, "description", description, 500);
    }
    finish(errors)
}

pub fn validate_role(body: &mut RoleBody) -> Result<(), ApiError> {
    body.name = capitalize(body.name.trim());
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "name", &body.name);
    finish(errors)
}

pub fn validate_comment(body: &mut CommentBody) -> Result<(), ApiError> {
    body.content = capitalize(body.content.trim());
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "content", &body.content);
    check_max(&mut errors, "content", &body.content, 500);
    check_positive(&mut errors, "idea_id", body.idea_id);
    finish(errors)
}

pub fn validate_comment_update(body: &mut CommentUpdateBody) -> Result<(), ApiError> {
    body.content = capitalize(body.content.trim());
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "content", &body.content);
    check_max(&mut errors, "content", &body.content, 500);
    finish(errors)
}

pub fn validate_like(body: &LikeBody) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_positive(&mut errors, "idea_id", body.idea_id);
    finish(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_rules() {
        assert!(is_strong_password("Abcdefg1"));
        assert!(!is_strong_password("abcdefg1")); // no uppercase
        assert!(!is_strong_password("Abcdefgh")); // no digit
        assert!(!is_strong_password("Ab1")); // too short
    }

    #[test]
    fn idea_body_requires_tags() {
        let mut body =
            IdeaBody { title: "t".into(), content: "c".into(), tags: None };
        let err = validate_idea(&mut body).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.param == "tags"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn idea_title_is_capped() {
        let mut body = IdeaBody {
            title: "x".repeat(41),
            content: "c".into(),
            tags: Some(vec![1]),
        };
        assert!(validate_idea(&mut body).is_err());
    }

    #[test]
    fn comment_content_is_capitalized() {
        let mut body = CommentBody { content: "  hello there ".into(), idea_id: 1 };
        validate_comment(&mut body).unwrap();
        assert_eq!(body.content, "Hello there");
    }

    #[test]
    fn user_name_charset_is_enforced() {
        let mut body = UserBody {
            name: "rm -rf /".into(),
            email: "a@app.com".into(),
            password: "Abcdefg1".into(),
            role_id: 1,
        };
        assert!(validate_user(&mut body).is_err());
    }

    #[test]
    fn email_shape() {
        let mut ok = LoginBody { email: "user@app.com".into(), password: "x".into() };
        assert!(validate_login(&mut ok).is_ok());
        let mut bad = LoginBody { email: "user-at-app".into(), password: "x".into() };
        assert!(validate_login(&mut bad).is_err());
    }
}
