use std::sync::Arc;

use ideahub::config::AppConfig;
use ideahub::store::PgStore;
use ideahub::{app, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("starting ideahub in {:?} mode", config.environment);

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        eprintln!("configuration error: Missing required configuration: DATABASE_URL");
        std::process::exit(1);
    });
    let store = match PgStore::connect(&database_url).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("database connection failed: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.migrate().await {
        eprintln!("schema migration failed: {}", e);
        std::process::exit(1);
    }

    let state = AppState::new(Arc::new(store), config);
    let router = app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, router).await.expect("server");
}
