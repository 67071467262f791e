//! Webhook verification, event decoding, and opt-in dispatch.
//!
//! Framework-neutral: callers hand over the request headers and the raw
//! body bytes, and get back a typed event or outcome.

pub mod dispatch;
pub mod event;
pub mod signature;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use event::{BounceData, ClickData, ContactEventData, EmailEventData, WebhookEvent};
pub use signature::{
    sign, SignedHeaders, WebhookVerifier, ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
