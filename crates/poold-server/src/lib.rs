// ABOUTME: HTTP surface for poold: the signed interactions webhook and the health probe.
// ABOUTME: Uses Axum with shared state holding the ledger and the chat REST client.

pub mod app_state;
pub mod config;
pub mod interactions;
pub mod routes;
pub mod verify;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, PooldConfig};
pub use routes::create_router;
