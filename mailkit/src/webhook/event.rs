//! Typed webhook events.
//!
//! Payloads look like `{"type": "email.clicked", "created_at": "...",
//! "data": {...}}`. Known types decode `data` into a fixed shape; anything
//! else is kept as [`WebhookEvent::Unknown`] with the raw JSON.
//!
//! Only `email.clicked` drives a side effect, so only its `data` must match.
//! Other known types whose `data` has drifted are kept as `Unknown` and
//! still acknowledged.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::WebhookError;

/// Data carried by every `email.*` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailEventData {
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    /// Recipients in the order they were addressed
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present on `email.clicked`
    #[serde(default)]
    pub click: Option<ClickData>,
    /// Present on `email.bounced`
    #[serde(default)]
    pub bounce: Option<BounceData>,
}

impl EmailEventData {
    pub fn first_recipient(&self) -> Option<&str> {
        self.to.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClickData {
    pub link: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, rename = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(default, rename = "userAgent")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BounceData {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub bounce_type: Option<String>,
    #[serde(default, rename = "subType")]
    pub sub_type: Option<String>,
}

/// Data carried by `contact.*` events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactEventData {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub audience_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub unsubscribed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    EmailSent(EmailEventData),
    EmailDelivered(EmailEventData),
    EmailDeliveryDelayed(EmailEventData),
    EmailComplained(EmailEventData),
    EmailBounced(EmailEventData),
    EmailOpened(EmailEventData),
    EmailClicked(EmailEventData),
    EmailReceived(EmailEventData),
    ContactCreated(ContactEventData),
    ContactUpdated(ContactEventData),
    ContactDeleted(ContactEventData),
    Unknown { event_type: String, data: Value },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    #[serde(default)]
    data: Value,
}

impl WebhookEvent {
    /// Decode a verified request body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let event_type = raw
            .event_type
            .ok_or_else(|| WebhookError::MalformedPayload("missing event type".to_string()))?;

        // A missing `data` object decodes like an empty one
        let data = match raw.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let event = match event_type.as_str() {
            "email.clicked" => Self::EmailClicked(serde_json::from_value(data).map_err(|e| {
                WebhookError::MalformedPayload(format!("{}: {}", event_type, e))
            })?),
            "email.sent" => Self::decode_or_unknown(event_type, data, Self::EmailSent),
            "email.delivered" => Self::decode_or_unknown(event_type, data, Self::EmailDelivered),
            "email.delivery_delayed" => {
                Self::decode_or_unknown(event_type, data, Self::EmailDeliveryDelayed)
            }
            "email.complained" => Self::decode_or_unknown(event_type, data, Self::EmailComplained),
            "email.bounced" => Self::decode_or_unknown(event_type, data, Self::EmailBounced),
            "email.opened" => Self::decode_or_unknown(event_type, data, Self::EmailOpened),
            "email.received" => Self::decode_or_unknown(event_type, data, Self::EmailReceived),
            "contact.created" => Self::decode_or_unknown(event_type, data, Self::ContactCreated),
            "contact.updated" => Self::decode_or_unknown(event_type, data, Self::ContactUpdated),
            "contact.deleted" => Self::decode_or_unknown(event_type, data, Self::ContactDeleted),
            _ => Self::Unknown { event_type, data },
        };

        Ok(event)
    }

    /// The `type` tag exactly as it appeared on the wire.
    pub fn event_type(&self) -> &str {
        match self {
            Self::EmailSent(_) => "email.sent",
            Self::EmailDelivered(_) => "email.delivered",
            Self::EmailDeliveryDelayed(_) => "email.delivery_delayed",
            Self::EmailComplained(_) => "email.complained",
            Self::EmailBounced(_) => "email.bounced",
            Self::EmailOpened(_) => "email.opened",
            Self::EmailClicked(_) => "email.clicked",
            Self::EmailReceived(_) => "email.received",
            Self::ContactCreated(_) => "contact.created",
            Self::ContactUpdated(_) => "contact.updated",
            Self::ContactDeleted(_) => "contact.deleted",
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// Email data for any `email.*` event.
    pub fn email_data(&self) -> Option<&EmailEventData> {
        match self {
            Self::EmailSent(d)
            | Self::EmailDelivered(d)
            | Self::EmailDeliveryDelayed(d)
            | Self::EmailComplained(d)
            | Self::EmailBounced(d)
            | Self::EmailOpened(d)
            | Self::EmailClicked(d)
            | Self::EmailReceived(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }

    fn decode_or_unknown<T: DeserializeOwned>(
        event_type: String,
        data: Value,
        variant: fn(T) -> Self,
    ) -> Self {
        match T::deserialize(&data) {
            Ok(decoded) => variant(decoded),
            Err(e) => {
                warn!(event_type = %event_type, error = %e, "webhook_data_unrecognized");
                Self::Unknown { event_type, data }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clicked() {
        let body = br#"{
            "type": "email.clicked",
            "created_at": "2024-11-22T23:41:12.126Z",
            "data": {
                "email_id": "56761188-7520-42d8-8898-ff6fc54ce618",
                "from": "Acme <onboarding@resend.dev>",
                "to": ["delivered@resend.dev", "second@resend.dev"],
                "subject": "Confirm your subscription",
                "click": {
                    "ipAddress": "122.115.53.11",
                    "link": "https://example.com/confirmed",
                    "timestamp": "2024-11-24T05:00:57.163Z",
                    "userAgent": "Mozilla/5.0"
                }
            }
        }"#;

        let event = WebhookEvent::parse(body).unwrap();
        assert_eq!(event.event_type(), "email.clicked");

        let WebhookEvent::EmailClicked(data) = &event else {
            panic!("Expected EmailClicked, got {:?}", event);
        };
        assert_eq!(data.first_recipient(), Some("delivered@resend.dev"));
        assert_eq!(data.click.as_ref().unwrap().link, "https://example.com/confirmed");
    }

    #[test]
    fn test_unknown_type_keeps_raw_data() {
        let body = br#"{"type": "domain.updated", "data": {"id": "d_1"}}"#;
        let event = WebhookEvent::parse(body).unwrap();

        assert!(!event.is_known());
        assert_eq!(event.event_type(), "domain.updated");
        match event {
            WebhookEvent::Unknown { data, .. } => assert_eq!(data["id"], "d_1"),
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let err = WebhookEvent::parse(br#"{"data": {}}"#).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = WebhookEvent::parse(b"not json").unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_clicked_with_wrong_data_shape_is_malformed() {
        let err = WebhookEvent::parse(br#"{"type": "email.clicked", "data": {"to": "a@x.com"}}"#)
            .unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload(_)));
    }

    #[test]
    fn test_drifted_acknowledged_type_kept_as_unknown() {
        let event = WebhookEvent::parse(br#"{"type": "email.delivered", "data": {"to": "a@x.com"}}"#)
            .unwrap();

        assert!(!event.is_known());
        assert_eq!(event.event_type(), "email.delivered");
        match event {
            WebhookEvent::Unknown { data, .. } => assert_eq!(data["to"], "a@x.com"),
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_decodes_as_empty() {
        let event = WebhookEvent::parse(br#"{"type": "email.clicked"}"#).unwrap();
        assert_eq!(event.email_data().unwrap().first_recipient(), None);
    }

    #[test]
    fn test_contact_event_without_email_not_typed() {
        let event = WebhookEvent::parse(br#"{"type": "contact.created", "data": {"id": "c1"}}"#)
            .unwrap();
        assert!(!event.is_known());

        let event = WebhookEvent::parse(
            br#"{"type": "contact.created", "data": {"id": "c1", "email": "a@x.com", "unsubscribed": true}}"#,
        )
        .unwrap();
        assert!(event.email_data().is_none());
        assert_eq!(event.event_type(), "contact.created");
    }
}
