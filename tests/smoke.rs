// ABOUTME: End-to-end smoke test for the full poold borrow/return lifecycle.
// ABOUTME: Drives signed interactions through the router against an in-memory store.

use std::sync::Arc;

use axum::body::Body;
use ed25519_dalek::{Signer, SigningKey};
use http::Request;
use tower::ServiceExt;

use poold_bot::DiscordRest;
use poold_core::testing::MemoryStore;
use poold_core::{AccountStatus, HolderId, Ledger};
use poold_server::{AppState, create_router};

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[3u8; 32])
}

fn test_state(store: Arc<MemoryStore>) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(Ledger::new(store)),
        // Announcements go to an unreachable host; they are best-effort.
        DiscordRest::new("test-token".to_string()).with_base_url("http://127.0.0.1:9".to_string()),
        signing_key().verifying_key(),
        "app-1".to_string(),
    ))
}

fn signed_interaction(payload: &serde_json::Value) -> Request<Body> {
    let body = serde_json::to_string(payload).unwrap();
    let timestamp = "1700000000";
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    let signature = hex::encode(signing_key().sign(&message).to_bytes());

    Request::post("/interactions")
        .header("content-type", "application/json")
        .header("x-signature-ed25519", signature)
        .header("x-signature-timestamp", timestamp)
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn member(id: &str, username: &str) -> serde_json::Value {
    serde_json::json!({
        "user": { "id": id, "username": username },
        "permissions": "0"
    })
}

#[tokio::test]
async fn smoke_test_full_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let state = test_state(store.clone());

    // 1. Register an account through the modal flow.
    let app = create_router(Arc::clone(&state));
    let field = |id: &str, value: &str| {
        serde_json::json!({ "components": [{ "custom_id": id, "value": value }] })
    };
    let register = serde_json::json!({
        "type": 5,
        "data": {
            "custom_id": "register_account",
            "components": [
                field("name", "Acct1"),
                field("id", "id1"),
                field("password", "pw1"),
                field("rank", "Beginner"),
            ]
        },
        "member": member("11", "alice")
    });

    let resp = app.oneshot(signed_interaction(&register)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let json = json_body(resp).await;
    assert_eq!(json["data"]["content"], "Registered account Acct1.");

    let rows = store.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AccountStatus::Available);

    // 2. Start a borrow: the new account shows up as a choice.
    let app = create_router(Arc::clone(&state));
    let use_account = serde_json::json!({
        "type": 2,
        "data": { "name": "use_account" },
        "member": member("11", "alice"),
        "channel_id": "c1"
    });

    let resp = app.oneshot(signed_interaction(&use_account)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let json = json_body(resp).await;
    let options = json["data"]["components"][0]["components"][0]["options"]
        .as_array()
        .unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0]["value"], "id1");

    // 3. Complete the borrow via the selection component.
    let app = create_router(Arc::clone(&state));
    let select = serde_json::json!({
        "type": 3,
        "data": { "custom_id": "account_select", "values": ["id1"] },
        "member": member("11", "alice"),
        "channel_id": "c1"
    });

    let resp = app.oneshot(signed_interaction(&select)).await.unwrap();
    let json = json_body(resp).await;
    assert_eq!(json["data"]["content"], "You borrowed Acct1.");
    assert_eq!(store.snapshot().await[0].status, AccountStatus::Borrowed);
    assert!(state.ledger.is_active(HolderId(11)).await);

    // 4. A second borrow attempt by the same user is refused.
    let app = create_router(Arc::clone(&state));
    let resp = app.oneshot(signed_interaction(&use_account)).await.unwrap();
    let json = json_body(resp).await;
    assert_eq!(
        json["data"]["content"],
        "You are already borrowing an account. Please return it first."
    );

    // 5. Another user sees an empty pool.
    let app = create_router(Arc::clone(&state));
    let other_borrow = serde_json::json!({
        "type": 2,
        "data": { "name": "use_account" },
        "member": member("22", "bob"),
        "channel_id": "c1"
    });
    let resp = app.oneshot(signed_interaction(&other_borrow)).await.unwrap();
    let json = json_body(resp).await;
    assert_eq!(json["data"]["content"], "No accounts are available right now.");

    // 6. Return the account.
    let app = create_router(Arc::clone(&state));
    let give_back = serde_json::json!({
        "type": 2,
        "data": { "name": "return_account" },
        "member": member("11", "alice"),
        "channel_id": "c1"
    });

    let resp = app.oneshot(signed_interaction(&give_back)).await.unwrap();
    let json = json_body(resp).await;
    assert_eq!(json["data"]["content"], "You returned Acct1.");
    assert_eq!(store.snapshot().await[0].status, AccountStatus::Available);
    assert!(!state.ledger.is_active(HolderId(11)).await);

    // 7. A return with nothing borrowed is a quiet refusal.
    let app = create_router(Arc::clone(&state));
    let resp = app.oneshot(signed_interaction(&give_back)).await.unwrap();
    let json = json_body(resp).await;
    assert_eq!(json["data"]["content"], "You have no account to return.");
}

#[tokio::test]
async fn smoke_test_rejects_forged_requests() {
    let state = test_state(Arc::new(MemoryStore::new()));
    let app = create_router(state);

    // Signed with the wrong key.
    let wrong_key = SigningKey::from_bytes(&[8u8; 32]);
    let body = r#"{"type":1}"#;
    let timestamp = "1700000000";
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    let signature = hex::encode(wrong_key.sign(&message).to_bytes());

    let request = Request::post("/interactions")
        .header("content-type", "application/json")
        .header("x-signature-ed25519", signature)
        .header("x-signature-timestamp", timestamp)
        .body(Body::from(body))
        .unwrap();

    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(resp.status(), 401);
}
