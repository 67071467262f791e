//! Error types shared by the API client, the webhook dispatcher, and the
//! opt-in flow.

use thiserror::Error;

/// Failure surfaced by the Resend API or the transport underneath it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout, or body decoding failure
    #[error("Resend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the API
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Base URL could not be joined with an endpoint path
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status reported by the API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Webhook verification and dispatch failures.
///
/// Each variant maps to exactly one HTTP status; see [`WebhookError::status_code`].
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing webhook headers")]
    MissingHeaders,

    #[error("Webhook secret not configured")]
    MissingSecret,

    #[error("Invalid webhook secret")]
    InvalidSecret,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook timestamp")]
    InvalidTimestamp,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("RESEND_AUDIENCE_ID not configured")]
    MissingAudience,

    #[error("No recipient in webhook data")]
    MissingRecipient,

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// Directory failure, message passed through unchanged
    #[error("{0}")]
    Collaborator(#[from] ApiError),
}

impl WebhookError {
    /// HTTP status class for this failure: client faults are 4xx,
    /// configuration and upstream faults are 5xx.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::MissingHeaders
            | WebhookError::InvalidSignature
            | WebhookError::InvalidTimestamp
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingRecipient => 400,
            WebhookError::ContactNotFound(_) => 404,
            WebhookError::MissingSecret
            | WebhookError::InvalidSecret
            | WebhookError::MissingAudience
            | WebhookError::Collaborator(_) => 500,
        }
    }
}

/// Double opt-in subscribe failures.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("RESEND_AUDIENCE_ID not configured")]
    MissingAudience,

    #[error("Missing required field: email")]
    MissingEmail,

    #[error("{0}")]
    Api(#[from] ApiError),
}

impl SubscribeError {
    pub fn status_code(&self) -> u16 {
        match self {
            SubscribeError::MissingEmail => 400,
            SubscribeError::MissingAudience | SubscribeError::Api(_) => 500,
        }
    }
}
