mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::fixture;
use ideahub::store::Datastore as _;

#[tokio::test]
async fn signup_enforces_password_strength() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post(
            "/users",
            None,
            json!({"name": "New User", "email": "new@app.com", "password": "weakpass", "role_id": 2}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid request body");
    assert_eq!(body["errors"][0]["param"], "password");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_unknown_role_and_taken_email() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post(
            "/users",
            None,
            json!({"name": "New User", "email": "new@app.com", "password": "Password1", "role_id": 99}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "No role exists with that id");

    let (status, body) = f
        .app
        .post(
            "/users",
            None,
            json!({"name": "New User", "email": "alice@app.com", "password": "Password1", "role_id": 2}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Email already in use");
    Ok(())
}

#[tokio::test]
async fn signup_returns_the_public_shape() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post(
            "/users",
            None,
            json!({"name": "New User", "email": "new@app.com", "password": "Password1", "role_id": 2}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@app.com");
    assert_eq!(body["role"]["name"], "Member");
    assert!(body.get("password").is_none());
    assert!(body["ideas"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn users_update_only_themselves() -> Result<()> {
    let f = fixture().await?;
    let bob_token = f.app.token_for(&f.bob);

    let uri = format!("/users/{}", f.alice.id);
    let (status, body) = f
        .app
        .put(&uri, Some(&bob_token), json!({"name": "Hijacked Name"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["msg"], "Forbidden");

    // target untouched
    let alice = f.app.store.user(f.alice.id).await?.unwrap();
    assert_eq!(alice.name, "Alice Doe");

    let alice_token = f.app.token_for(&f.alice);
    let (status, body) = f
        .app
        .put(&uri, Some(&alice_token), json!({"name": "Alice Prime"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice Prime");
    Ok(())
}

#[tokio::test]
async fn non_owner_non_admin_cannot_delete_a_user() -> Result<()> {
    let f = fixture().await?;
    let bob_token = f.app.token_for(&f.bob);

    let uri = format!("/users/{}", f.alice.id);
    let (status, _) = f.app.delete(&uri, Some(&bob_token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(f.app.store.user(f.alice.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn admin_deletes_anyone_and_everything_cascades() -> Result<()> {
    let f = fixture().await?;
    let tag = f.app.store.insert_tag(ideahub::store::NewTag {
        name: "infra".into(),
        description: String::new(),
    })
    .await?;
    let idea = f.app.store.insert_idea(ideahub::store::NewIdea {
        title: "t".into(),
        content: "c".into(),
        user_id: f.alice.id,
    })
    .await?;
    f.app.store.link_idea_tags(idea.id, &[tag.id]).await?;

    let admin_token = f.app.token_for(&f.admin);
    let uri = format!("/users/{}", f.alice.id);
    let (status, _) = f.app.delete(&uri, Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::OK);

    assert!(f.app.store.user(f.alice.id).await?.is_none());
    assert!(f.app.store.idea(idea.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_user_is_a_404() -> Result<()> {
    let f = fixture().await?;
    let token = f.app.token_for(&f.alice);
    let (status, body) = f.app.get("/users/999", Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "No such user exists");
    Ok(())
}

#[tokio::test]
async fn removing_an_unset_avatar_is_a_404() -> Result<()> {
    let f = fixture().await?;
    let token = f.app.token_for(&f.alice);
    let uri = format!("/users/{}/img", f.alice.id);
    let (status, body) = f.app.delete(&uri, Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "No such avatar exists");
    Ok(())
}
