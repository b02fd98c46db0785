use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ideahub::auth::{self, Claims};
use ideahub::config::AppConfig;
use ideahub::store::{Datastore, MemoryStore, NewUser, Role, User};
use ideahub::{app, AppState};

/// In-process application over the in-memory store: the full router with
/// auth middleware, no sockets, no Postgres. Each test gets a fresh one.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = AppConfig::for_tests();
        let state = AppState::new(store.clone(), config.clone());
        Self { router: app(state), store, config }
    }

    /// First role seeded gets id 1, which is the admin role id in the
    /// test configuration.
    pub async fn seed_role(&self, name: &str) -> Result<Role> {
        Ok(self.store.insert_role(name).await?)
    }

    pub async fn seed_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role_id: i64,
    ) -> Result<User> {
        let hashed = auth::hash_password(password, &self.config.security)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(self
            .store
            .insert_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password: hashed,
                role_id,
                profile_img: String::new(),
            })
            .await?)
    }

    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.role_id, self.config.security.jwt_expiry_hours);
        auth::issue_token(&claims, &self.config.security).expect("token")
    }

    /// Drive one request through the router and decode the JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn put(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.request("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("DELETE", uri, token, None).await
    }
}

/// Standard fixture: admin role (id 1), member role, one admin, two
/// regular users.
pub struct Fixture {
    pub app: TestApp,
    pub admin: User,
    pub alice: User,
    pub bob: User,
}

pub async fn fixture() -> Result<Fixture> {
    let app = TestApp::new();
    let admin_role = app.seed_role("Admin").await?;
    assert_eq!(admin_role.id, app.config.security.admin_role_id);
    let member = app.seed_role("Member").await?;

    let admin = app.seed_user("Admin One", "admin@app.com", "Password1", admin_role.id).await?;
    let alice = app.seed_user("Alice Doe", "alice@app.com", "Password1", member.id).await?;
    let bob = app.seed_user("Bob Stone", "bob@app.com", "Password1", member.id).await?;
    Ok(Fixture { app, admin, alice, bob })
}
