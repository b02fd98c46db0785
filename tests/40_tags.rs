mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::fixture;

#[tokio::test]
async fn tag_mutation_is_admin_only() -> Result<()> {
    let f = fixture().await?;
    let alice_token = f.app.token_for(&f.alice);
    let (status, _) = f
        .app
        .post("/tags", Some(&alice_token), json!({"name": "infra"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = f.app.token_for(&f.admin);
    let (status, body) = f
        .app
        .post("/tags", Some(&admin_token), json!({"name": "infra", "description": "ops"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "infra");

    let (status, body) = f
        .app
        .post("/tags", Some(&admin_token), json!({"name": "infra"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Unable to create tag");
    Ok(())
}

#[tokio::test]
async fn role_mutation_is_admin_only() -> Result<()> {
    let f = fixture().await?;
    let alice_token = f.app.token_for(&f.alice);
    let (status, _) = f
        .app
        .post("/roles", Some(&alice_token), json!({"name": "moderator"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = f.app.token_for(&f.admin);
    let (status, body) = f
        .app
        .post("/roles", Some(&admin_token), json!({"name": "moderator"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    // role names are capitalized on write
    assert_eq!(body["name"], "Moderator");

    let uri = format!("/roles/{}", f.alice.role_id);
    let (status, body) = f.app.delete(&uri, Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Role is assigned to users, cannot remove");
    Ok(())
}

#[tokio::test]
async fn subscription_conflicts_are_reported() -> Result<()> {
    let f = fixture().await?;
    let admin_token = f.app.token_for(&f.admin);
    let (_, tag) = f
        .app
        .post("/tags", Some(&admin_token), json!({"name": "infra"}))
        .await?;
    let tag_id = tag["id"].as_i64().unwrap();

    let alice_token = f.app.token_for(&f.alice);
    let uri = format!("/tags/{}/user/{}", tag_id, f.alice.id);
    let (status, _) = f.app.post(&uri, Some(&alice_token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = f.app.post(&uri, Some(&alice_token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User is already subscribed to this tag");

    let (status, _) = f.app.delete(&uri, Some(&alice_token)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = f.app.delete(&uri, Some(&alice_token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User is not subscribed to this tag");
    Ok(())
}

#[tokio::test]
async fn users_subscribe_only_themselves() -> Result<()> {
    let f = fixture().await?;
    let admin_token = f.app.token_for(&f.admin);
    let (_, tag) = f
        .app
        .post("/tags", Some(&admin_token), json!({"name": "infra"}))
        .await?;
    let tag_id = tag["id"].as_i64().unwrap();

    let bob_token = f.app.token_for(&f.bob);
    let uri = format!("/tags/{}/user/{}", tag_id, f.alice.id);
    let (status, _) = f.app.post(&uri, Some(&bob_token), json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // admin bypass covers other users
    let (status, _) = f.app.post(&uri, Some(&admin_token), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn subscribing_to_a_missing_tag_names_it() -> Result<()> {
    let f = fixture().await?;
    let alice_token = f.app.token_for(&f.alice);
    let uri = format!("/tags/999/user/{}", f.alice.id);
    let (status, body) = f.app.post(&uri, Some(&alice_token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Tag 999 does not exist.");
    Ok(())
}

#[tokio::test]
async fn usr_query_embeds_subscribers() -> Result<()> {
    let f = fixture().await?;
    let admin_token = f.app.token_for(&f.admin);
    let (_, tag) = f
        .app
        .post("/tags", Some(&admin_token), json!({"name": "infra"}))
        .await?;
    let tag_id = tag["id"].as_i64().unwrap();
    let uri = format!("/tags/{}/user/{}", tag_id, f.alice.id);
    let (_, _) = f
        .app
        .post(&uri, Some(&f.app.token_for(&f.alice)), json!({}))
        .await?;

    let (status, body) = f.app.get(&format!("/tags/{}?usr=true", tag_id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"][0]["id"], f.alice.id);

    // without the flag the plain shape comes back
    let (_, body) = f.app.get(&format!("/tags/{}", tag_id), None).await?;
    assert!(body.get("users").is_none());
    Ok(())
}
