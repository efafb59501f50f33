// ABOUTME: Shared application state for the poold HTTP server.
// ABOUTME: Holds the ledger, the chat REST client, and interaction verification material.

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;

use poold_bot::DiscordRest;
use poold_core::Ledger;

/// Shared state accessible by all Axum handlers.
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub rest: DiscordRest,
    pub public_key: VerifyingKey,
    pub application_id: String,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        ledger: Arc<Ledger>,
        rest: DiscordRest,
        public_key: VerifyingKey,
        application_id: String,
    ) -> Self {
        Self {
            ledger,
            rest,
            public_key,
            application_id,
        }
    }
}
