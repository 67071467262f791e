//! Thin async client for the Resend REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{
    ApiErrorBody, Audience, BatchResponse, Contact, CreateContact, CreatedResource, Domain,
    EmailRecord, ListResponse, SendEmail, UpdateContact, MAX_BATCH_SIZE,
};
use super::{ContactDirectory, EmailTransport};
use crate::error::ApiError;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Authenticated Resend client. Cheap to clone; clones share one
/// connection pool.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl ResendClient {
    /// Client for the production API with a 30 second request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, Duration::from_secs(30))
    }

    /// Client for an arbitrary API base URL (mock servers, proxies).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "{} cannot be used as an API base URL",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    /// Append `segments` to the base URL. Each segment is percent-encoded,
    /// so ids containing `/` or `..` stay inside their own segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Always Ok: cannot-be-a-base URLs are rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Make an authenticated request and decode the JSON response.
    async fn api_request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<T, ApiError> {
        let response = self.send_request(method, segments, body).await?;
        Ok(response.json::<T>().await?)
    }

    /// Make an authenticated request whose response body is irrelevant.
    async fn api_call(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<(), ApiError> {
        self.send_request(method, segments, body).await?;
        Ok(())
    }

    async fn send_request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(segments);
        debug!(method = %method, url = %url, "resend_request");

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.api_key);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or_else(|_| fallback_message(status, &text));

        warn!(
            method = %method,
            path = url.path(),
            status = status.as_u16(),
            error = %message,
            "resend_request_failed"
        );

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Send up to [`MAX_BATCH_SIZE`] emails in one call.
    ///
    /// Batch emails cannot carry attachments or a schedule.
    pub async fn send_batch(&self, emails: &[SendEmail]) -> Result<Vec<CreatedResource>, ApiError> {
        if emails.is_empty() {
            return Err(ApiError::InvalidRequest("batch is empty".to_string()));
        }
        if emails.len() > MAX_BATCH_SIZE {
            return Err(ApiError::InvalidRequest(format!(
                "batch of {} exceeds the limit of {}",
                emails.len(),
                MAX_BATCH_SIZE
            )));
        }
        if let Some(i) = emails.iter().position(|e| !e.is_batchable()) {
            return Err(ApiError::InvalidRequest(format!(
                "email {} has attachments or a schedule, which batch send does not support",
                i + 1
            )));
        }

        let response: BatchResponse = self
            .api_request(Method::POST, &["emails", "batch"], Some(emails))
            .await?;

        info!(count = response.data.len(), "resend_batch_sent");
        Ok(response.data)
    }

    pub async fn list_audiences(&self) -> Result<Vec<Audience>, ApiError> {
        let response: ListResponse<Audience> = self
            .api_request(Method::GET, &["audiences"], None::<&()>)
            .await?;
        Ok(response.data)
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>, ApiError> {
        let response: ListResponse<Domain> = self
            .api_request(Method::GET, &["domains"], None::<&()>)
            .await?;
        Ok(response.data)
    }

    pub async fn get_domain(&self, domain_id: &str) -> Result<Domain, ApiError> {
        self.api_request(Method::GET, &["domains", domain_id], None::<&()>)
            .await
    }

    /// Ask the API to re-check the domain's DNS records.
    pub async fn verify_domain(&self, domain_id: &str) -> Result<(), ApiError> {
        self.api_call(Method::POST, &["domains", domain_id, "verify"], None::<&()>)
            .await
    }
}

#[async_trait]
impl EmailTransport for ResendClient {
    async fn send_email(&self, email: &SendEmail) -> Result<CreatedResource, ApiError> {
        let created: CreatedResource = self.api_request(Method::POST, &["emails"], Some(email)).await?;

        info!(
            email_id = %created.id,
            recipients = email.to.len(),
            attachments = email.attachments.len(),
            scheduled = email.scheduled_at.is_some(),
            "resend_email_sent"
        );

        Ok(created)
    }

    async fn get_email(&self, email_id: &str) -> Result<EmailRecord, ApiError> {
        self.api_request(Method::GET, &["emails", email_id], None::<&()>)
            .await
    }

    async fn cancel_email(&self, email_id: &str) -> Result<(), ApiError> {
        self.api_call(Method::POST, &["emails", email_id, "cancel"], None::<&()>)
            .await?;

        info!(email_id = %email_id, "resend_email_cancelled");
        Ok(())
    }
}

#[async_trait]
impl ContactDirectory for ResendClient {
    async fn create_contact(&self, contact: &CreateContact) -> Result<CreatedResource, ApiError> {
        let path = ["audiences", contact.audience_id.as_str(), "contacts"];
        let created: CreatedResource = self.api_request(Method::POST, &path, Some(contact)).await?;

        info!(
            contact_id = %created.id,
            audience_id = %contact.audience_id,
            unsubscribed = contact.unsubscribed,
            "resend_contact_created"
        );

        Ok(created)
    }

    async fn list_contacts(&self, audience_id: &str) -> Result<Vec<Contact>, ApiError> {
        let path = ["audiences", audience_id, "contacts"];
        let response: ListResponse<Contact> =
            self.api_request(Method::GET, &path, None::<&()>).await?;
        Ok(response.data)
    }

    async fn update_contact(
        &self,
        audience_id: &str,
        contact_id: &str,
        update: &UpdateContact,
    ) -> Result<(), ApiError> {
        let path = ["audiences", audience_id, "contacts", contact_id];
        self.api_call(Method::PATCH, &path, Some(update)).await?;

        info!(
            contact_id = %contact_id,
            audience_id = %audience_id,
            unsubscribed = ?update.unsubscribed,
            "resend_contact_updated"
        );

        Ok(())
    }

    async fn remove_contact(&self, audience_id: &str, contact_id: &str) -> Result<(), ApiError> {
        let path = ["audiences", audience_id, "contacts", contact_id];
        self.api_call(Method::DELETE, &path, None::<&()>).await?;

        info!(contact_id = %contact_id, audience_id = %audience_id, "resend_contact_removed");
        Ok(())
    }
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    if text.trim().is_empty() {
        format!("Resend returned {}", status)
    } else {
        format!("Resend returned {}: {}", status, text.trim())
    }
}
