//! Mailkit - Resend webhook verification and double opt-in toolkit.
//!
//! This library backs the two Mailkit binaries:
//! - `mailkit-web`: web server for sending, webhooks, and double opt-in
//! - `mailkit`: command line client for the Resend API
//!
//! ## Architecture
//!
//! ```text
//! Resend → svix-signed POST → web → webhook::Dispatcher → resend::ContactDirectory
//! ```

pub mod config;
pub mod error;
pub mod optin;
pub mod resend;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, SubscribeError, WebhookError};
pub use resend::{ContactDirectory, EmailTransport, ResendClient};
pub use web::AppState;
pub use webhook::{DispatchOutcome, Dispatcher, WebhookEvent, WebhookVerifier};
