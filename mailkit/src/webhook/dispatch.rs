//! Double opt-in confirmation.
//!
//! ```text
//! signed request → verify → WebhookEvent → email.clicked? → find contact → unsubscribed=false
//! ```
//!
//! Every other event type is acknowledged and ignored.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::{info, warn};

use super::event::WebhookEvent;
use super::signature::WebhookVerifier;
use crate::error::WebhookError;
use crate::resend::{ContactDirectory, UpdateContact};

/// Result of handling one verified event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub received: bool,
    #[serde(rename = "type")]
    pub event_type: String,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
}

impl DispatchOutcome {
    fn ignored(event_type: &str) -> Self {
        Self {
            received: true,
            event_type: event_type.to_string(),
            confirmed: false,
            message: Some("Event type ignored".to_string()),
            email: None,
            contact_id: None,
        }
    }

    fn confirmed(event_type: &str, email: String, contact_id: String) -> Self {
        Self {
            received: true,
            event_type: event_type.to_string(),
            confirmed: true,
            message: None,
            email: Some(email),
            contact_id: Some(contact_id),
        }
    }
}

/// Verifies webhook deliveries and confirms opt-ins.
///
/// Holds no mutable state; one instance serves all requests concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    verifier: WebhookVerifier,
    directory: Arc<dyn ContactDirectory>,
    audience_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        verifier: WebhookVerifier,
        directory: Arc<dyn ContactDirectory>,
        audience_id: Option<String>,
    ) -> Self {
        Self {
            verifier,
            directory,
            audience_id,
        }
    }

    /// Verify the signature and decode the event without acting on it.
    pub fn verify_event(&self, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, WebhookError> {
        self.verifier.verify(headers, body)?;
        WebhookEvent::parse(body)
    }

    /// Verify, decode, and dispatch one delivery.
    pub async fn verify_and_dispatch(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<DispatchOutcome, WebhookError> {
        let event = self.verify_event(headers, body)?;
        self.dispatch(&event).await
    }

    /// Act on an already-verified event.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome, WebhookError> {
        let data = match event {
            WebhookEvent::EmailClicked(data) => data,
            other => {
                info!(event_type = other.event_type(), "webhook_event_ignored");
                return Ok(DispatchOutcome::ignored(other.event_type()));
            }
        };

        let audience_id = self
            .audience_id
            .as_deref()
            .ok_or(WebhookError::MissingAudience)?;

        let recipient = data.first_recipient().ok_or_else(|| {
            warn!(email_id = ?data.email_id, "optin_missing_recipient");
            WebhookError::MissingRecipient
        })?;

        let contacts = self.directory.list_contacts(audience_id).await?;

        // Exact, case-sensitive match on the first listing page only
        let contact = contacts.iter().find(|c| c.email == recipient).ok_or_else(|| {
            warn!(
                email = %recipient,
                audience_id = %audience_id,
                contacts_scanned = contacts.len(),
                "optin_contact_not_found"
            );
            WebhookError::ContactNotFound(recipient.to_string())
        })?;

        self.directory
            .update_contact(
                audience_id,
                &contact.id,
                &UpdateContact::default().with_unsubscribed(false),
            )
            .await?;

        info!(
            contact_id = %contact.id,
            email = %recipient,
            was_pending = contact.unsubscribed,
            "optin_confirmed"
        );

        Ok(DispatchOutcome::confirmed(
            event.event_type(),
            recipient.to_string(),
            contact.id.clone(),
        ))
    }
}
