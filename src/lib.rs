pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod store;
pub mod validation;

pub use handlers::app;
pub use state::AppState;
