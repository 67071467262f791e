//! Request and response types for the Resend REST API.
//!
//! Field names follow the API's snake_case JSON. Optional request fields are
//! omitted from the body when unset.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine as _;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maximum number of emails accepted by one batch call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Header Gmail uses to decide whether messages belong to one thread.
pub const ENTITY_REF_HEADER: &str = "X-Entity-Ref-ID";

// =============================================================================
// Emails
// =============================================================================

/// Outgoing email.
#[derive(Debug, Clone, Serialize)]
pub struct SendEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    /// Hosted template; replaces `html` and `text`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<EmailTemplate>,
}

impl SendEmail {
    pub fn new<I, S>(from: impl Into<String>, to: I, subject: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            html: None,
            text: None,
            attachments: Vec::new(),
            headers: HashMap::new(),
            scheduled_at: None,
            template: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Render a dashboard template instead of inline content. Clears any
    /// `html` or `text` already set, since the API rejects the combination.
    pub fn with_template(mut self, template: EmailTemplate) -> Self {
        self.html = None;
        self.text = None;
        self.template = Some(template);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Tag the message with a fresh `X-Entity-Ref-ID` so Gmail shows it as
    /// its own conversation instead of threading it by subject.
    pub fn with_unique_thread(self) -> Self {
        self.with_header(ENTITY_REF_HEADER, Uuid::new_v4().to_string())
    }

    /// Schedule delivery at an absolute time (ISO 8601 / RFC 3339, or the
    /// API's natural-language form such as "in 1 min").
    pub fn with_scheduled_at(mut self, at: impl Into<String>) -> Self {
        self.scheduled_at = Some(at.into());
        self
    }

    /// Schedule delivery `delay` from now. The API accepts up to 7 days ahead.
    pub fn scheduled_in(self, delay: Duration) -> Self {
        let at = Utc::now() + delay;
        self.with_scheduled_at(at.to_rfc3339())
    }

    /// Whether this email can be part of a batch call.
    pub fn is_batchable(&self) -> bool {
        self.attachments.is_empty() && self.scheduled_at.is_none()
    }
}

/// Reference to a template published in the Resend dashboard.
///
/// Variable names must match the template exactly; they are case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailTemplate {
    pub id: String,
    pub variables: HashMap<String, Value>,
}

impl EmailTemplate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// File attached to an email. `content` is base64.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

impl Attachment {
    /// Attach content that is already base64-encoded.
    pub fn new(filename: impl Into<String>, base64_content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: base64_content.into(),
            content_id: None,
        }
    }

    /// Attach raw bytes, encoding them as standard base64.
    pub fn from_bytes(filename: impl Into<String>, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::new(filename, encoded)
    }

    /// Read a file from disk and attach it under its own file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        Ok(Self::from_bytes(filename, &bytes))
    }

    /// Mark the attachment inline; reference it from HTML as `cid:<content_id>`.
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// `src` value for an `<img>` tag pointing at this attachment.
    pub fn cid_src(&self) -> Option<String> {
        self.content_id.as_ref().map(|id| format!("cid:{}", id))
    }
}

/// Identifier returned by any create/send call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedResource {
    pub id: String,
}

/// Batch send response.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    pub data: Vec<CreatedResource>,
}

/// Email as returned by `GET /emails/{id}`. Inbound emails reported by an
/// `email.received` event are fetched the same way.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub last_event: Option<String>,
}

impl EmailRecord {
    /// First `max_chars` characters of the text body, with an ellipsis when cut.
    pub fn text_preview(&self, max_chars: usize) -> Option<String> {
        let text = self.text.as_ref()?;
        if text.chars().count() > max_chars {
            let cut: String = text.chars().take(max_chars).collect();
            Some(format!("{}...", cut))
        } else {
            Some(text.clone())
        }
    }
}

// =============================================================================
// Contacts & audiences
// =============================================================================

/// Contact record within an audience.
///
/// `unsubscribed` doubles as the opt-in marker: `true` while a sign-up is
/// waiting for confirmation, `false` once confirmed. A confirmed subscriber
/// who later unsubscribes looks the same as a pending one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub unsubscribed: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for `POST /audiences/{audience_id}/contacts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateContact {
    #[serde(skip)]
    pub audience_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub unsubscribed: bool,
}

impl CreateContact {
    pub fn new(audience_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            audience_id: audience_id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            unsubscribed: false,
        }
    }

    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    pub fn with_unsubscribed(mut self, unsubscribed: bool) -> Self {
        self.unsubscribed = unsubscribed;
        self
    }
}

/// Body for `PATCH /audiences/{audience_id}/contacts/{id}`. Only set fields
/// are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed: Option<bool>,
}

impl UpdateContact {
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    pub fn with_unsubscribed(mut self, unsubscribed: bool) -> Self {
        self.unsubscribed = Some(unsubscribed);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audience {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Envelope used by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

// =============================================================================
// Domains
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub records: Vec<DomainRecord>,
}

/// DNS record the domain owner must publish.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}
