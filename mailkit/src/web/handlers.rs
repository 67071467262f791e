//! HTTP endpoint handlers.
//!
//! Handlers only translate between HTTP and the library: the webhook routes
//! hand raw bytes to the [`Dispatcher`], the opt-in route calls
//! [`optin::subscribe`]. Every failure becomes a `{"error": ...}` body.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{SubscribeError, WebhookError};
use crate::optin::{self, OptInSettings};
use crate::resend::{ContactDirectory, EmailTemplate, EmailTransport, ResendClient, SendEmail};
use crate::webhook::{DispatchOutcome, Dispatcher, WebhookEvent, WebhookVerifier};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transport: Arc<dyn EmailTransport>,
    pub directory: Arc<dyn ContactDirectory>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// State backed by one Resend client for both collaborators.
    pub fn new(config: Config, client: ResendClient) -> Self {
        let client = Arc::new(client);
        Self::with_collaborators(config, client.clone(), client)
    }

    pub fn with_collaborators(
        config: Config,
        transport: Arc<dyn EmailTransport>,
        directory: Arc<dyn ContactDirectory>,
    ) -> Self {
        let verifier = WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance());
        let dispatcher = Dispatcher::new(verifier, directory.clone(), config.audience_id.clone());

        Self {
            config: Arc::new(config),
            transport,
            directory,
            dispatcher,
        }
    }

    fn optin_settings(&self) -> OptInSettings {
        OptInSettings {
            audience_id: self.config.audience_id.clone(),
            from: self.config.email_from.clone(),
            confirm_url: self.config.confirm_redirect_url.clone(),
        }
    }
}

/// Error body shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Unreadable JSON bodies are client faults like any other.
fn rejected_body(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "request_body_rejected");
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

/// The value of a required string field, if present and not blank.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.to_string())
    }
}

impl IntoResponse for SubscribeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.to_string())
    }
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Send
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub id: String,
}

/// Send a one-paragraph HTML email from the configured sender.
pub async fn send(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection),
    };

    let (Some(to), Some(subject), Some(message)) =
        (required(body.to), required(body.subject), required(body.message))
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: to, subject, message",
        );
    };

    let html = format!("<p>{}</p>", htmlescape::encode_minimal(&message));
    let email = SendEmail::new(&state.config.email_from, [to.as_str()], subject).with_html(html);

    deliver(&state, &email, &to).await
}

/// Request body for a hosted-template send.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTemplateRequest {
    pub to: Option<String>,
    pub template_id: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

pub const TEMPLATE_SUBJECT: &str = "Email from Template";

/// Send a dashboard template, filling in `variables` verbatim.
pub async fn send_template(
    State(state): State<AppState>,
    payload: Result<Json<SendTemplateRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection),
    };

    let (Some(to), Some(template_id)) = (required(body.to), required(body.template_id)) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields: to, templateId");
    };

    let template = EmailTemplate {
        id: template_id,
        variables: body.variables,
    };
    let email = SendEmail::new(&state.config.email_from, [to.as_str()], TEMPLATE_SUBJECT)
        .with_template(template);

    deliver(&state, &email, &to).await
}

async fn deliver(state: &AppState, email: &SendEmail, to: &str) -> Response {
    match state.transport.send_email(email).await {
        Ok(created) => {
            info!(
                email_id = %created.id,
                to = %to,
                template = ?email.template.as_ref().map(|t| t.id.as_str()),
                "send_complete"
            );
            Json(SendResponse {
                success: true,
                id: created.id,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, to = %to, "send_failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// =============================================================================
// Generic Webhook
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Verify and acknowledge any event. Nothing is acted upon.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let event = state
        .dispatcher
        .verify_event(&headers, &body)
        .inspect_err(|e| warn!(error = %e, "webhook_rejected"))?;

    log_event(&event);

    Ok(Json(WebhookAck {
        received: true,
        event_type: event.event_type().to_string(),
    }))
}

fn log_event(event: &WebhookEvent) {
    match event {
        WebhookEvent::EmailReceived(data) => info!(
            email_id = ?data.email_id,
            from = ?data.from,
            subject = ?data.subject,
            "webhook_inbound_email"
        ),
        WebhookEvent::EmailBounced(data) => warn!(
            email_id = ?data.email_id,
            to = ?data.to,
            reason = ?data.bounce.as_ref().and_then(|b| b.message.as_deref()),
            "webhook_email_bounced"
        ),
        WebhookEvent::EmailComplained(data) => warn!(
            email_id = ?data.email_id,
            to = ?data.to,
            "webhook_email_complained"
        ),
        WebhookEvent::Unknown { event_type, .. } => {
            info!(event_type = %event_type, "webhook_unknown_event")
        }
        other => info!(
            event_type = other.event_type(),
            email_id = ?other.email_data().and_then(|d| d.email_id.as_deref()),
            "webhook_event_received"
        ),
    }
}

// =============================================================================
// Double Opt-In
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: &'static str,
    pub contact_id: String,
    pub email_id: String,
}

/// Create a pending contact and send the confirmation email.
pub async fn double_optin_subscribe(
    State(state): State<AppState>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, Response> {
    let Json(body) = payload.map_err(rejected_body)?;
    let email = body.email.unwrap_or_default();

    let subscription = optin::subscribe(
        state.directory.as_ref(),
        state.transport.as_ref(),
        &state.optin_settings(),
        &email,
        body.name.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, email = %email, "optin_subscribe_failed");
        e.into_response()
    })?;

    Ok(Json(SubscribeResponse {
        success: true,
        message: "Confirmation email sent",
        contact_id: subscription.contact_id,
        email_id: subscription.email_id,
    }))
}

/// Confirm a pending contact when its confirmation link is clicked.
pub async fn double_optin_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchOutcome>, WebhookError> {
    let outcome = state
        .dispatcher
        .verify_and_dispatch(&headers, &body)
        .await
        .inspect_err(|e| warn!(error = %e, status = e.status_code(), "optin_webhook_rejected"))?;

    Ok(Json(outcome))
}
