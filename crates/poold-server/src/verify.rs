// ABOUTME: Ed25519 signature verification for interaction callbacks.
// ABOUTME: The platform signs timestamp || body; unsigned or bad requests get 401.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("public key is not valid hex: {0}")]
    Hex(String),

    #[error("public key has wrong length: expected 32 bytes, got {0}")]
    Length(usize),

    #[error("bytes do not form an ed25519 public key: {0}")]
    Invalid(String),
}

/// Parse the application public key from its hex form.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|e| KeyError::Hex(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::Length(bytes.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::Invalid(e.to_string()))
}

/// Check an interaction request signature. The signed message is the
/// timestamp header concatenated with the raw request body.
pub fn verify_signature(
    key: &VerifyingKey,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> bool {
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature).is_ok()
}
