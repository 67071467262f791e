//! Double opt-in sign-up.
//!
//! ## Flow
//!
//! ```text
//! subscribe() → contact (unsubscribed=true) → confirmation email
//!             → recipient clicks → email.clicked webhook → Dispatcher → unsubscribed=false
//! ```

pub mod template;

use serde::Serialize;
use tracing::info;

use crate::error::SubscribeError;
use crate::resend::{ContactDirectory, CreateContact, EmailTransport, SendEmail};

pub use template::{confirmation_html, confirmation_text, greeting, CONFIRM_SUBJECT};

/// Settings for the sign-up half of the flow.
#[derive(Debug, Clone)]
pub struct OptInSettings {
    pub audience_id: Option<String>,
    pub from: String,
    pub confirm_url: String,
}

/// Identifiers created by a successful sign-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub contact_id: String,
    pub email_id: String,
}

/// Register `email` as a pending contact and send the confirmation email.
///
/// The contact is created first; if sending then fails the contact stays
/// pending and the error is returned as is.
pub async fn subscribe(
    directory: &dyn ContactDirectory,
    transport: &dyn EmailTransport,
    settings: &OptInSettings,
    email: &str,
    name: Option<&str>,
) -> Result<Subscription, SubscribeError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(SubscribeError::MissingEmail);
    }

    let audience_id = settings
        .audience_id
        .as_deref()
        .ok_or(SubscribeError::MissingAudience)?;

    let name = name.map(str::trim).filter(|n| !n.is_empty());

    let mut contact = CreateContact::new(audience_id, email).with_unsubscribed(true);
    if let Some(name) = name {
        contact = contact.with_first_name(name);
    }

    let created = directory.create_contact(&contact).await?;
    info!(contact_id = %created.id, email = %email, "optin_contact_pending");

    let message = SendEmail::new(&settings.from, [email], CONFIRM_SUBJECT)
        .with_html(confirmation_html(name, &settings.confirm_url))
        .with_text(confirmation_text(name, &settings.confirm_url));

    let sent = transport.send_email(&message).await?;
    info!(
        contact_id = %created.id,
        email_id = %sent.id,
        "optin_confirmation_sent"
    );

    Ok(Subscription {
        contact_id: created.id,
        email_id: sent.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::resend::{Contact, CreatedResource, EmailRecord, UpdateContact};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        contacts: Mutex<Vec<CreateContact>>,
        emails: Mutex<Vec<SendEmail>>,
        fail_send: bool,
    }

    #[async_trait]
    impl ContactDirectory for Recorder {
        async fn create_contact(&self, contact: &CreateContact) -> Result<CreatedResource, ApiError> {
            self.contacts.lock().unwrap().push(contact.clone());
            Ok(CreatedResource { id: "c_1".to_string() })
        }

        async fn list_contacts(&self, _audience_id: &str) -> Result<Vec<Contact>, ApiError> {
            Ok(Vec::new())
        }

        async fn update_contact(&self, _: &str, _: &str, _: &UpdateContact) -> Result<(), ApiError> {
            Ok(())
        }

        async fn remove_contact(&self, _: &str, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmailTransport for Recorder {
        async fn send_email(&self, email: &SendEmail) -> Result<CreatedResource, ApiError> {
            if self.fail_send {
                return Err(ApiError::Api {
                    status: 422,
                    message: "Invalid `from` field".to_string(),
                });
            }
            self.emails.lock().unwrap().push(email.clone());
            Ok(CreatedResource { id: "e_1".to_string() })
        }

        async fn get_email(&self, _email_id: &str) -> Result<EmailRecord, ApiError> {
            unimplemented!("not used by subscribe")
        }

        async fn cancel_email(&self, _email_id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn settings(audience_id: Option<&str>) -> OptInSettings {
        OptInSettings {
            audience_id: audience_id.map(str::to_string),
            from: "Acme <onboarding@resend.dev>".to_string(),
            confirm_url: "https://example.com/confirmed".to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_creates_pending_contact_and_sends() {
        let recorder = Recorder::default();

        let subscription = subscribe(&recorder, &recorder, &settings(Some("aud_1")), "jane@x.com", Some("Jane"))
            .await
            .unwrap();

        assert_eq!(subscription.contact_id, "c_1");
        assert_eq!(subscription.email_id, "e_1");

        let contacts = recorder.contacts.lock().unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].audience_id, "aud_1");
        assert!(contacts[0].unsubscribed);
        assert_eq!(contacts[0].first_name.as_deref(), Some("Jane"));

        let emails = recorder.emails.lock().unwrap();
        assert_eq!(emails[0].to, vec!["jane@x.com".to_string()]);
        assert_eq!(emails[0].subject, CONFIRM_SUBJECT);
        assert!(emails[0].html.as_ref().unwrap().contains("Welcome, Jane!"));
    }

    #[tokio::test]
    async fn test_subscribe_without_name() {
        let recorder = Recorder::default();

        subscribe(&recorder, &recorder, &settings(Some("aud_1")), "jane@x.com", Some(""))
            .await
            .unwrap();

        assert!(recorder.contacts.lock().unwrap()[0].first_name.is_none());
        assert!(recorder.emails.lock().unwrap()[0]
            .html
            .as_ref()
            .unwrap()
            .contains("Welcome!"));
    }

    #[tokio::test]
    async fn test_subscribe_requires_audience() {
        let recorder = Recorder::default();

        let err = subscribe(&recorder, &recorder, &settings(None), "jane@x.com", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscribeError::MissingAudience));
        assert!(recorder.contacts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_requires_email() {
        let recorder = Recorder::default();

        let err = subscribe(&recorder, &recorder, &settings(Some("aud_1")), "  ", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscribeError::MissingEmail));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_send_failure_propagates_message() {
        let recorder = Recorder {
            fail_send: true,
            ..Default::default()
        };

        let err = subscribe(&recorder, &recorder, &settings(Some("aud_1")), "jane@x.com", None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid `from` field");
        // Contact was still created and stays pending
        assert_eq!(recorder.contacts.lock().unwrap().len(), 1);
    }
}
