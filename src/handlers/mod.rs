pub mod auth;
pub mod comments;
pub mod ideas;
pub mod likes;
pub mod roles;
pub mod tags;
pub mod users;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the full application router over the given state. Tests call
/// this with an in-memory store; `main` with Postgres.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/users", post(users::create))
        .route("/ideas", get(ideas::index))
        .route("/ideas/:id", get(ideas::show))
        .route("/tags", get(tags::index))
        .route("/tags/:id", get(tags::show))
        .route("/roles", get(roles::index))
        .route("/roles/:id", get(roles::show))
        .route("/likes/idea/:id", get(likes::for_idea))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/login/token", post(auth::refresh))
        .route("/users", get(users::index))
        .route("/users/:id", get(users::show).put(users::update).delete(users::remove))
        .route("/users/:id/img", put(users::update_avatar).delete(users::remove_avatar))
        .route("/roles", post(roles::create))
        .route("/roles/:id", put(roles::update).delete(roles::remove))
        .route("/tags", post(tags::create))
        .route("/tags/:id", put(tags::update).delete(tags::remove))
        .route(
            "/tags/:id/user/:user_id",
            post(tags::subscribe).delete(tags::unsubscribe),
        )
        .route("/ideas", post(ideas::create))
        .route("/ideas/:id", put(ideas::update).delete(ideas::remove))
        .route("/comments", get(comments::index).post(comments::create))
        .route(
            "/comments/:id",
            get(comments::show).put(comments::update).delete(comments::remove),
        )
        .route("/comments/idea/:id", get(comments::for_idea))
        .route("/likes", get(likes::index).post(likes::create))
        .route("/likes/:id", get(likes::show).delete(likes::remove))
        .route("/likes/idea/:id", post(likes::like_idea).delete(likes::dislike_idea))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "ideahub",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/auth/login, /auth/login/token",
            "users": "/users[/:id], /users/:id/img",
            "roles": "/roles[/:id]",
            "tags": "/tags[/:id], /tags/:id/user/:user_id",
            "ideas": "/ideas[/:id]",
            "comments": "/comments[/:id], /comments/idea/:id",
            "likes": "/likes[/:id], /likes/idea/:id",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    // Cheap round trip through the gateway; any store works.
    match state.store.roles().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "timestamp": now})),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "timestamp": now})),
            )
        }
    }
}
