// ABOUTME: The interactions webhook: payload types, dispatch, and response JSON.
// ABOUTME: Verifies request signatures, then routes commands, selections, and modal submits.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use poold_bot::commands;
use poold_bot::commands::{BorrowStart, CommandReply};
use poold_core::{HolderId, StoreError};

use crate::app_state::SharedState;
use crate::verify::verify_signature;

// Interaction and response types from the platform's interaction model.
const INTERACTION_PING: u8 = 1;
const INTERACTION_COMMAND: u8 = 2;
const INTERACTION_COMPONENT: u8 = 3;
const INTERACTION_MODAL: u8 = 5;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED: u8 = 5;
const RESPONSE_MODAL: u8 = 9;

const FLAG_EPHEMERAL: u64 = 64;

const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;
const PERMISSION_MANAGE_MESSAGES: u64 = 1 << 13;

/// A selection menu carries at most this many options.
const MAX_SELECT_OPTIONS: usize = 25;

const SELECT_ACCOUNT_ID: &str = "account_select";
const REGISTER_MODAL_ID: &str = "register_account";

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: Option<String>,
    pub data: Option<InteractionData>,
    pub member: Option<Member>,
    pub user: Option<User>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    pub name: Option<String>,
    pub custom_id: Option<String>,
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct ActionRow {
    #[serde(default)]
    pub components: Vec<SubmittedField>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedField {
    pub custom_id: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: User,
    pub permissions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl Interaction {
    /// The invoking user: guild interactions wrap it in `member`, DM
    /// interactions carry it at the top level.
    fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }

    fn holder(&self) -> Option<HolderId> {
        self.invoker()
            .and_then(|u| u.id.parse().ok())
            .map(HolderId)
    }

    /// Whether the invoker's permission bitfield allows administrative
    /// commands. The platform resolved the bitfield before delivering the
    /// interaction.
    fn is_admin(&self) -> bool {
        let Some(permissions) = self
            .member
            .as_ref()
            .and_then(|m| m.permissions.as_deref())
        else {
            return false;
        };
        let Ok(bits) = permissions.parse::<u64>() else {
            return false;
        };
        bits & (PERMISSION_ADMINISTRATOR | PERMISSION_MANAGE_MESSAGES) != 0
    }
}

/// POST /interactions. Verifies the request signature, answers the PING
/// handshake, and dispatches everything else to the command handlers.
pub async fn handle_interaction(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_str(&headers, "x-signature-ed25519");
    let timestamp = header_str(&headers, "x-signature-timestamp");

    let verified = match (signature, timestamp) {
        (Some(signature), Some(timestamp)) => {
            verify_signature(&state.public_key, signature, timestamp, &body)
        }
        _ => false,
    };
    if !verified {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid request signature" })),
        )
            .into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(err) => {
            tracing::warn!(error = %err, "unparseable interaction payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed interaction" })),
            )
                .into_response();
        }
    };

    dispatch(state, interaction).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn dispatch(state: SharedState, interaction: Interaction) -> Response {
    match interaction.kind {
        INTERACTION_PING => Json(json!({ "type": RESPONSE_PONG })).into_response(),
        INTERACTION_COMMAND => dispatch_command(state, interaction).await,
        INTERACTION_COMPONENT => dispatch_component(state, interaction).await,
        INTERACTION_MODAL => dispatch_modal(state, interaction).await,
        other => {
            tracing::warn!(kind = other, "unsupported interaction type");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "unsupported interaction type" })),
            )
                .into_response()
        }
    }
}

async fn dispatch_command(state: SharedState, interaction: Interaction) -> Response {
    let name = interaction
        .data
        .as_ref()
        .and_then(|d| d.name.as_deref())
        .unwrap_or("");

    match name {
        "register" => register_modal_response(),

        "use_account" => {
            let Some(holder) = interaction.holder() else {
                return ephemeral("Could not identify you; try again.");
            };
            match commands::begin_borrow(&state.ledger, holder).await {
                Ok(BorrowStart::AlreadyBorrowing) => {
                    ephemeral("You are already borrowing an account. Please return it first.")
                }
                Ok(BorrowStart::NoneAvailable) => {
                    ephemeral("No accounts are available right now.")
                }
                Ok(BorrowStart::Choices(choices)) => select_account_response(&choices),
                Err(err) => store_failure(err),
            }
        }

        "return_account" => {
            let Some(holder) = interaction.holder() else {
                return ephemeral("Could not identify you; try again.");
            };
            let user_name = interaction
                .invoker()
                .map(|u| u.username.clone())
                .unwrap_or_default();
            match commands::return_account(&state.ledger, holder, &user_name).await {
                Ok(reply) => announce_and_reply(&state, &interaction, reply).await,
                Err(err) => store_failure(err),
            }
        }

        "reset_borrowed" => {
            if !interaction.is_admin() {
                return ephemeral("You do not have permission to do that.");
            }
            let Some(target) = target_user_option(&interaction) else {
                return ephemeral("Specify which user to reset.");
            };
            let reply = commands::reset_borrowed(&state.ledger, target).await;
            ephemeral(&reply.message)
        }

        "remove_comment" => {
            if !interaction.is_admin() {
                return ephemeral("You do not have permission to do that.");
            }
            let (Some(channel_id), Some(token)) =
                (interaction.channel_id.clone(), interaction.token.clone())
            else {
                return ephemeral("This command only works in a channel.");
            };
            spawn_purge(state, channel_id, token);
            deferred_ephemeral()
        }

        other => {
            tracing::warn!(command = other, "unknown command");
            ephemeral("Unknown command.")
        }
    }
}

async fn dispatch_component(state: SharedState, interaction: Interaction) -> Response {
    let custom_id = interaction
        .data
        .as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .unwrap_or("");

    match custom_id {
        SELECT_ACCOUNT_ID => {
            let Some(holder) = interaction.holder() else {
                return ephemeral("Could not identify you; try again.");
            };
            let Some(account_id) = interaction
                .data
                .as_ref()
                .and_then(|d| d.values.as_ref())
                .and_then(|v| v.first())
                .cloned()
            else {
                return ephemeral("No account was selected.");
            };
            let user_name = interaction
                .invoker()
                .map(|u| u.username.clone())
                .unwrap_or_default();

            match commands::complete_borrow(&state.ledger, holder, &account_id, &user_name).await
            {
                Ok(reply) => announce_and_reply(&state, &interaction, reply).await,
                Err(err) => store_failure(err),
            }
        }
        other => {
            tracing::warn!(custom_id = other, "unknown component");
            ephemeral("Unknown selection.")
        }
    }
}

async fn dispatch_modal(state: SharedState, interaction: Interaction) -> Response {
    let custom_id = interaction
        .data
        .as_ref()
        .and_then(|d| d.custom_id.as_deref())
        .unwrap_or("");

    match custom_id {
        REGISTER_MODAL_ID => {
            let Some(data) = interaction.data.as_ref() else {
                return ephemeral("Empty form submission.");
            };
            let field = |id: &str| submitted_field(data, id);
            let (Some(name), Some(account_id), Some(password), Some(rank)) = (
                field("name"),
                field("id"),
                field("password"),
                field("rank"),
            ) else {
                return ephemeral("The registration form was incomplete.");
            };

            match commands::register(&state.ledger, name, account_id, password, rank).await {
                Ok(reply) => ephemeral(&reply.message),
                Err(err) => store_failure(err),
            }
        }
        other => {
            tracing::warn!(custom_id = other, "unknown modal");
            ephemeral("Unknown form.")
        }
    }
}

/// Pull one submitted text input out of a modal payload.
fn submitted_field(data: &InteractionData, custom_id: &str) -> Option<String> {
    data.components
        .iter()
        .flat_map(|row| row.components.iter())
        .find(|field| field.custom_id == custom_id)
        .map(|field| field.value.clone())
}

/// The `user` option of an admin command, parsed into a holder id.
fn target_user_option(interaction: &Interaction) -> Option<HolderId> {
    interaction
        .data
        .as_ref()?
        .options
        .iter()
        .find(|o| o.name == "user")
        .and_then(|o| o.value.as_str())
        .and_then(|v| v.parse().ok())
        .map(HolderId)
}

/// Send the public announcement (best-effort) and return the ephemeral
/// reply as the interaction response.
async fn announce_and_reply(
    state: &SharedState,
    interaction: &Interaction,
    reply: CommandReply,
) -> Response {
    if let (Some(announcement), Some(channel_id)) =
        (reply.announcement.as_deref(), interaction.channel_id.as_deref())
        && let Err(err) = state.rest.create_message(channel_id, announcement).await
    {
        tracing::warn!(error = %err, channel = channel_id, "failed to post announcement");
    }
    ephemeral(&reply.message)
}

/// Run the purge in the background and report through a follow-up; the
/// interaction itself gets a deferred response within the callback window.
fn spawn_purge(state: SharedState, channel_id: String, interaction_token: String) {
    tokio::spawn(async move {
        let content = match commands::purge_messages(&state.rest, &channel_id).await {
            Ok(report) => report.summary(),
            Err(err) => {
                tracing::error!(error = %err, channel = %channel_id, "channel purge failed");
                "Cleanup failed partway through; run the command again.".to_string()
            }
        };

        if let Err(err) = state
            .rest
            .create_followup(&state.application_id, &interaction_token, &content, true)
            .await
        {
            tracing::warn!(error = %err, "failed to post purge follow-up");
        }
    });
}

fn ephemeral(content: &str) -> Response {
    Json(json!({
        "type": RESPONSE_MESSAGE,
        "data": { "content": content, "flags": FLAG_EPHEMERAL }
    }))
    .into_response()
}

fn deferred_ephemeral() -> Response {
    Json(json!({
        "type": RESPONSE_DEFERRED,
        "data": { "flags": FLAG_EPHEMERAL }
    }))
    .into_response()
}

fn store_failure(err: StoreError) -> Response {
    tracing::error!(error = %err, "store operation failed");
    ephemeral("The account store is unavailable right now. Please try again later.")
}

/// Response presenting the available accounts as a selection menu.
fn select_account_response(choices: &[(String, String)]) -> Response {
    let options: Vec<Value> = choices
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|(label, value)| json!({ "label": label, "value": value }))
        .collect();

    Json(json!({
        "type": RESPONSE_MESSAGE,
        "data": {
            "content": "Choose an account:",
            "flags": FLAG_EPHEMERAL,
            "components": [{
                "type": 1,
                "components": [{
                    "type": 3,
                    "custom_id": SELECT_ACCOUNT_ID,
                    "placeholder": "Choose an account",
                    "options": options
                }]
            }]
        }
    }))
    .into_response()
}

/// Response opening the four-field registration form.
fn register_modal_response() -> Response {
    let text_input = |id: &str, label: &str| {
        json!({
            "type": 1,
            "components": [{
                "type": 4,
                "custom_id": id,
                "label": label,
                "style": 1,
                "required": true
            }]
        })
    };

    Json(json!({
        "type": RESPONSE_MODAL,
        "data": {
            "custom_id": REGISTER_MODAL_ID,
            "title": "Register a new account",
            "components": [
                text_input("name", "Name"),
                text_input("id", "ID"),
                text_input("password", "Password"),
                text_input("rank", "Rank"),
            ]
        }
    }))
    .into_response()
}
