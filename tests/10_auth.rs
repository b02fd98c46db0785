mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::fixture;
use ideahub::store::Datastore as _;

#[tokio::test]
async fn login_with_unknown_email_is_404() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post("/auth/login", None, json!({"email": "nobody@app.com", "password": "Password1"}))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "No such user exists");
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_400() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post("/auth/login", None, json!({"email": "alice@app.com", "password": "WrongPass1"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid password");
    Ok(())
}

#[tokio::test]
async fn login_returns_token_and_public_user() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post("/auth/login", None, json!({"email": "alice@app.com", "password": "Password1"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], f.alice.id);
    assert_eq!(body["email"], "alice@app.com");
    assert!(body["token"].is_string());
    assert!(body.get("password").is_none());

    // the issued token opens the protected group
    let token = body["token"].as_str().unwrap().to_string();
    let (status, _) = f.app.get("/users", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_rejected() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f
        .app
        .post("/auth/login", None, json!({"email": "not-an-email", "password": ""}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid request body");
    assert!(body["errors"].as_array().map(|a| a.len() >= 2).unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let f = fixture().await?;
    let (status, body) = f.app.get("/users", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Unauthorized");

    let (status, _) = f.app.get("/users", Some("not.a.token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_of_a_deleted_user_stops_working() -> Result<()> {
    let f = fixture().await?;
    let token = f.app.token_for(&f.bob);
    let (status, _) = f.app.get("/users", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);

    f.app.store.delete_user(f.bob.id).await?;
    let (status, _) = f.app.get("/users", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_refresh_reflects_the_current_role() -> Result<()> {
    let f = fixture().await?;
    let token = f.app.token_for(&f.alice);
    let (status, body) = f.app.post("/auth/login/token", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], f.alice.id);
    assert!(body["token"].is_string());
    Ok(())
}
