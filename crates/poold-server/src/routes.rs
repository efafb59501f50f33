// ABOUTME: Route definitions for the poold HTTP surface.
// ABOUTME: Assembles the health probe and the interactions webhook into one Axum Router.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::app_state::SharedState;
use crate::interactions;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/interactions", post(interactions::handle_interaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe. Returns 200 OK with a plain body.
async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use ed25519_dalek::{Signer, SigningKey};
    use http::Request;
    use tower::ServiceExt;

    use poold_bot::DiscordRest;
    use poold_core::Ledger;
    use poold_core::testing::MemoryStore;

    use crate::app_state::AppState;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    fn test_state() -> SharedState {
        Arc::new(AppState::new(
            Arc::new(Ledger::new(Arc::new(MemoryStore::new()))),
            DiscordRest::new("t".to_string()).with_base_url("http://127.0.0.1:9".to_string()),
            signing_key().verifying_key(),
            "app-1".to_string(),
        ))
    }

    fn signed_request(body: &str) -> Request<Body> {
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(signing_key().sign(&message).to_bytes());

        Request::post("/interactions")
            .header("content-type", "application/json")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", timestamp)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_plain_ok() {
        let app = create_router(test_state());
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn signed_ping_is_answered() {
        let app = create_router(test_state());
        let resp = app.oneshot(signed_request(r#"{"type":1}"#)).await.unwrap();

        assert_eq!(resp.status(), 200);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["type"], 1);
    }

    #[tokio::test]
    async fn unsigned_interaction_is_rejected() {
        let app = create_router(test_state());
        let resp = app
            .oneshot(
                Request::post("/interactions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn wrongly_signed_interaction_is_rejected() {
        let app = create_router(test_state());
        let mut request = signed_request(r#"{"type":1}"#);
        // Flip the timestamp after signing.
        request
            .headers_mut()
            .insert("x-signature-timestamp", "1700009999".parse().unwrap());

        let resp = app.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), 401);
    }
}
