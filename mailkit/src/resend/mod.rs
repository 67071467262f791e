//! Resend API access.
//!
//! The webhook dispatcher and the opt-in flow only see the two collaborator
//! traits below; [`ResendClient`] implements both against the real API.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;

pub use client::{ResendClient, DEFAULT_BASE_URL};
pub use types::{
    Attachment, Audience, Contact, CreateContact, CreatedResource, Domain, DomainRecord,
    EmailRecord, EmailTemplate, SendEmail, UpdateContact, ENTITY_REF_HEADER, MAX_BATCH_SIZE,
};

/// Sends and inspects individual emails.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, email: &SendEmail) -> Result<CreatedResource, ApiError>;

    async fn get_email(&self, email_id: &str) -> Result<EmailRecord, ApiError>;

    /// Cancel a scheduled email that has not been sent yet.
    async fn cancel_email(&self, email_id: &str) -> Result<(), ApiError>;
}

/// Contact records scoped to an audience.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn create_contact(&self, contact: &CreateContact) -> Result<CreatedResource, ApiError>;

    /// Contacts in listing order. Only the first page is returned.
    async fn list_contacts(&self, audience_id: &str) -> Result<Vec<Contact>, ApiError>;

    async fn update_contact(
        &self,
        audience_id: &str,
        contact_id: &str,
        update: &UpdateContact,
    ) -> Result<(), ApiError>;

    async fn remove_contact(&self, audience_id: &str, contact_id: &str) -> Result<(), ApiError>;
}
