//! Web server module.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /send`: send a one-off email
//! - `POST /send-template`: send a dashboard template
//! - `POST /webhook`: verify and acknowledge any Resend event
//! - `POST /double-optin/subscribe`: start a double opt-in
//! - `POST /double-optin/webhook`: confirm on `email.clicked`

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    double_optin_subscribe, double_optin_webhook, health, send, send_template, webhook, AppState,
    ErrorResponse, HealthResponse, SendRequest, SendTemplateRequest, SubscribeRequest, WebhookAck,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/send", post(send))
        .route("/send-template", post(send_template))
        .route("/webhook", post(webhook))
        .route("/double-optin/subscribe", post(double_optin_subscribe))
        .route("/double-optin/webhook", post(double_optin_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
