mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{fixture, Fixture};
use ideahub::store::Datastore as _;

async fn seed_idea(f: &Fixture) -> Result<i64> {
    let idea = f
        .app
        .store
        .insert_idea(ideahub::store::NewIdea {
            title: "t".into(),
            content: "c".into(),
            user_id: f.alice.id,
        })
        .await?;
    Ok(idea.id)
}

#[tokio::test]
async fn commenting_a_missing_idea_is_rejected() -> Result<()> {
    let f = fixture().await?;
    let token = f.app.token_for(&f.bob);
    let (status, body) = f
        .app
        .post("/comments", Some(&token), json!({"content": "hello", "idea_id": 999}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Unable to comment this idea");
    Ok(())
}

#[tokio::test]
async fn comments_are_capitalized_and_embed_relations() -> Result<()> {
    let f = fixture().await?;
    let idea_id = seed_idea(&f).await?;
    let token = f.app.token_for(&f.bob);
    let (status, body) = f
        .app
        .post("/comments", Some(&token), json!({"content": "great idea", "idea_id": idea_id}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Great idea");
    assert_eq!(body["user"]["id"], f.bob.id);
    assert_eq!(body["idea"]["id"], idea_id);
    Ok(())
}

#[tokio::test]
async fn comment_mutation_is_owner_or_admin() -> Result<()> {
    let f = fixture().await?;
    let idea_id = seed_idea(&f).await?;
    let bob_token = f.app.token_for(&f.bob);
    let (_, comment) = f
        .app
        .post("/comments", Some(&bob_token), json!({"content": "mine", "idea_id": idea_id}))
        .await?;
    let uri = format!("/comments/{}", comment["id"].as_i64().unwrap());

    let alice_token = f.app.token_for(&f.alice);
    let (status, _) = f
        .app
        .put(&uri, Some(&alice_token), json!({"content": "hijack"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = f
        .app
        .put(&uri, Some(&bob_token), json!({"content": "edited"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Edited");

    let admin_token = f.app.token_for(&f.admin);
    let (status, _) = f.app.delete(&uri, Some(&admin_token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn comments_for_idea_lists_only_that_idea() -> Result<()> {
    let f = fixture().await?;
    let idea_id = seed_idea(&f).await?;
    let other_id = seed_idea(&f).await?;
    let token = f.app.token_for(&f.bob);
    f.app
        .post("/comments", Some(&token), json!({"content": "one", "idea_id": idea_id}))
        .await?;
    f.app
        .post("/comments", Some(&token), json!({"content": "two", "idea_id": other_id}))
        .await?;

    let (status, body) = f
        .app
        .get(&format!("/comments/idea/{}", idea_id), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["content"], "One");

    let (status, _) = f.app.get("/comments/idea/999", Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
