// ABOUTME: Configuration loading and validation for the poold server.
// ABOUTME: Reads environment variables at startup; missing or malformed values refuse to start.

use std::net::SocketAddr;

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

use poold_store::ServiceAccountKey;

use crate::verify::parse_public_key;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("CREDENTIALS_JSON is malformed: {0}")]
    InvalidCredentials(String),

    #[error("POOLD_PUBLIC_KEY is not a valid hex ed25519 public key: {0}")]
    InvalidPublicKey(String),

    #[error("POOLD_BIND is not a valid socket address: {0}")]
    InvalidBind(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PooldConfig {
    pub bot_token: String,
    pub credentials: ServiceAccountKey,
    pub sheet_id: String,
    pub sheet_tab: String,
    pub public_key: VerifyingKey,
    pub application_id: String,
    pub bind: SocketAddr,
}

impl PooldConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - TOKEN: chat platform bot token
    /// - CREDENTIALS_JSON: service-account credential blob for the store
    /// - POOLD_SHEET_ID: spreadsheet id
    /// - POOLD_PUBLIC_KEY: hex ed25519 key for interaction signatures
    /// - POOLD_APPLICATION_ID: application id for follow-up webhooks
    ///
    /// Optional:
    /// - POOLD_SHEET_TAB: worksheet tab name (default: Sheet1)
    /// - POOLD_BIND: socket address to bind (default: 0.0.0.0:8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required("TOKEN")?;

        let credentials_json = required("CREDENTIALS_JSON")?;
        let credentials = ServiceAccountKey::from_json(&credentials_json)
            .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;

        let sheet_id = required("POOLD_SHEET_ID")?;

        let public_key_hex = required("POOLD_PUBLIC_KEY")?;
        let public_key = parse_public_key(&public_key_hex)
            .map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))?;

        let application_id = required("POOLD_APPLICATION_ID")?;

        let sheet_tab =
            std::env::var("POOLD_SHEET_TAB").unwrap_or_else(|_| "Sheet1".to_string());

        let bind_str =
            std::env::var("POOLD_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        Ok(Self {
            bot_token,
            credentials,
            sheet_id,
            sheet_tab,
            public_key,
            application_id,
            bind,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}
