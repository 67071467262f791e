//! Resend (Svix) webhook signature verification.
//!
//! Resend signs webhook requests the Svix way:
//! - `svix-id`: unique message id
//! - `svix-timestamp`: Unix epoch seconds when the message was signed
//! - `svix-signature`: space-separated `v1,<base64>` tokens, one per active key
//!
//! Each token is base64(HMAC-SHA256(secret, "{id}.{timestamp}.{body}")) where
//! `secret` is the base64 part of the `whsec_...` signing secret and `body`
//! is the raw request body, byte for byte.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use std::time::Duration;

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// The three signed header values of a webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Extract the signed headers. A header that is absent, empty, or not
    /// valid text counts as missing.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        match (get(ID_HEADER), get(TIMESTAMP_HEADER), get(SIGNATURE_HEADER)) {
            (Some(id), Some(timestamp), Some(signature)) => Ok(Self {
                id,
                timestamp,
                signature,
            }),
            (id, timestamp, signature) => {
                warn!(
                    has_id = id.is_some(),
                    has_timestamp = timestamp.is_some(),
                    has_signature = signature.is_some(),
                    "webhook_signature_missing_headers"
                );
                Err(WebhookError::MissingHeaders)
            }
        }
    }
}

/// Verifies signed webhook requests against one signing secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: Option<String>, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify a request against the current time.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    /// Verify a request as if the current time were `now` (epoch seconds).
    ///
    /// Checks run in a fixed order: headers, secret, timestamp, signature.
    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let signed = SignedHeaders::from_headers(headers)?;
        let key = decode_secret(self.secret.as_deref())?;

        let timestamp: i64 = signed.timestamp.parse().map_err(|_| {
            warn!(timestamp = %signed.timestamp, "webhook_signature_invalid_timestamp");
            WebhookError::InvalidTimestamp
        })?;

        let age = now.abs_diff(timestamp);
        if age > self.tolerance.as_secs() {
            warn!(
                webhook_time = timestamp,
                current_time = now,
                age_seconds = age,
                max_age_seconds = self.tolerance.as_secs(),
                "webhook_signature_stale"
            );
            return Err(WebhookError::InvalidTimestamp);
        }

        let mac = signed_mac(&key, &signed.id, &signed.timestamp, body)?;

        let matched = signed
            .signature
            .split_whitespace()
            .filter_map(|token| token.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            // verify_slice compares in constant time
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if !matched {
            warn!(
                msg_id = %signed.id,
                tokens = signed.signature.split_whitespace().count(),
                "webhook_signature_mismatch"
            );
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }
}

/// Produce the `svix-signature` header value for a payload.
///
/// Used to simulate deliveries locally; Resend signs real deliveries itself.
pub fn sign(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
    let key = decode_secret(Some(secret))?;
    let mac = signed_mac(&key, id, timestamp, body)?;
    let digest = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("{},{}", SIGNATURE_VERSION, digest))
}

/// Turn a `whsec_<base64>` secret into raw key bytes.
fn decode_secret(secret: Option<&str>) -> Result<Vec<u8>, WebhookError> {
    let secret = secret.map(str::trim).unwrap_or_default();
    if secret.is_empty() {
        warn!("webhook_secret_not_configured");
        return Err(WebhookError::MissingSecret);
    }

    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    STANDARD.decode(encoded).map_err(|_| {
        warn!("webhook_secret_invalid");
        WebhookError::InvalidSecret
    })
}

fn signed_mac(key: &[u8], id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}
