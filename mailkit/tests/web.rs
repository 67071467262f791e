//! End-to-end tests for the HTTP routes, driven through the router with
//! in-memory collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use mailkit::resend::{
    Contact, ContactDirectory, CreateContact, CreatedResource, EmailRecord, EmailTransport,
    SendEmail, UpdateContact,
};
use mailkit::webhook::{sign, ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use mailkit::{web, ApiError, AppState, Config};

const SECRET: &str = "whsec_dGVzdC1zaWduaW5nLWtleS1mb3ItbWFpbGtpdA==";
const AUDIENCE: &str = "aud_1";

#[derive(Default)]
struct InMemoryResend {
    contacts: Mutex<Vec<Contact>>,
    sent: Mutex<Vec<SendEmail>>,
}

impl InMemoryResend {
    fn with_contact(id: &str, email: &str, unsubscribed: bool) -> Arc<Self> {
        let store = Self::default();
        store.contacts.lock().unwrap().push(Contact {
            id: id.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            unsubscribed,
            created_at: None,
        });
        Arc::new(store)
    }

    fn contact(&self, id: &str) -> Option<Contact> {
        self.contacts.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }
}

#[async_trait]
impl ContactDirectory for InMemoryResend {
    async fn create_contact(&self, contact: &CreateContact) -> Result<CreatedResource, ApiError> {
        let mut contacts = self.contacts.lock().unwrap();
        let id = format!("c{}", contacts.len() + 1);
        contacts.push(Contact {
            id: id.clone(),
            email: contact.email.clone(),
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            unsubscribed: contact.unsubscribed,
            created_at: None,
        });
        Ok(CreatedResource { id })
    }

    async fn list_contacts(&self, _audience_id: &str) -> Result<Vec<Contact>, ApiError> {
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn update_contact(
        &self,
        _audience_id: &str,
        contact_id: &str,
        update: &UpdateContact,
    ) -> Result<(), ApiError> {
        let mut contacts = self.contacts.lock().unwrap();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == contact_id)
            .ok_or_else(|| ApiError::Api {
                status: 404,
                message: "Contact not found".to_string(),
            })?;
        if let Some(unsubscribed) = update.unsubscribed {
            contact.unsubscribed = unsubscribed;
        }
        Ok(())
    }

    async fn remove_contact(&self, _audience_id: &str, contact_id: &str) -> Result<(), ApiError> {
        self.contacts.lock().unwrap().retain(|c| c.id != contact_id);
        Ok(())
    }
}

#[async_trait]
impl EmailTransport for InMemoryResend {
    async fn send_email(&self, email: &SendEmail) -> Result<CreatedResource, ApiError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(CreatedResource {
            id: format!("e{}", sent.len()),
        })
    }

    async fn get_email(&self, email_id: &str) -> Result<EmailRecord, ApiError> {
        Err(ApiError::Api {
            status: 404,
            message: format!("Email {} not found", email_id),
        })
    }

    async fn cancel_email(&self, _email_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn config(secret: Option<&str>) -> Config {
    Config {
        api_key: Some("re_test".to_string()),
        webhook_secret: secret.map(str::to_string),
        email_from: "Acme <onboarding@resend.dev>".to_string(),
        audience_id: Some(AUDIENCE.to_string()),
        confirm_redirect_url: "https://example.com/confirmed".to_string(),
        port: 0,
        api_base_url: "http://localhost".to_string(),
        request_timeout_ms: 1_000,
        webhook_tolerance_secs: 300,
    }
}

fn app(config: Config, store: Arc<InMemoryResend>) -> axum::Router {
    web::router(AppState::with_collaborators(config, store.clone(), store))
}

fn signed_request(uri: &str, body: &Value) -> Request<Body> {
    let body = serde_json::to_vec(body).unwrap();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(SECRET, "msg_1", &timestamp, &body).unwrap();

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(ID_HEADER, "msg_1")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn clicked(to: &str) -> Value {
    json!({
        "type": "email.clicked",
        "created_at": "2024-11-22T23:41:12.126Z",
        "data": {
            "email_id": "e_9",
            "to": [to],
            "click": { "link": "https://example.com/confirmed" }
        }
    })
}

#[tokio::test]
async fn test_health() {
    let response = app(config(Some(SECRET)), Arc::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_clicked_confirms_pending_contact() {
    let store = InMemoryResend::with_contact("c1", "jane@x.com", true);

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(signed_request("/double-optin/webhook", &clicked("jane@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "received": true,
            "type": "email.clicked",
            "confirmed": true,
            "email": "jane@x.com",
            "contact_id": "c1"
        })
    );
    assert!(!store.contact("c1").unwrap().unsubscribed);
}

#[tokio::test]
async fn test_other_events_are_ignored() {
    let store = InMemoryResend::with_contact("c1", "jane@x.com", true);
    let event = json!({ "type": "email.opened", "data": { "to": ["jane@x.com"] } });

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(signed_request("/double-optin/webhook", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["confirmed"], json!(false));
    assert_eq!(body["message"], json!("Event type ignored"));
    assert!(store.contact("c1").unwrap().unsubscribed);
}

#[tokio::test]
async fn test_unsigned_request_rejected() {
    let response = app(config(Some(SECRET)), Arc::default())
        .oneshot(json_request("/double-optin/webhook", &clicked("jane@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing webhook headers" })
    );
}

#[tokio::test]
async fn test_tampered_body_rejected() {
    let store = InMemoryResend::with_contact("c1", "jane@x.com", true);
    let mut request = signed_request("/double-optin/webhook", &clicked("jane@x.com"));
    *request.body_mut() = Body::from(serde_json::to_vec(&clicked("mallory@x.com")).unwrap());

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.contact("c1").unwrap().unsubscribed);
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let response = app(config(None), Arc::default())
        .oneshot(signed_request("/double-optin/webhook", &clicked("jane@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unknown_contact_is_not_found() {
    let store = InMemoryResend::with_contact("c1", "jane@x.com", true);

    let response = app(config(Some(SECRET)), store)
        .oneshot(signed_request("/double-optin/webhook", &clicked("JANE@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_generic_webhook_acknowledges_any_type() {
    let event = json!({ "type": "domain.updated", "data": { "id": "d_1" } });

    let response = app(config(Some(SECRET)), Arc::default())
        .oneshot(signed_request("/webhook", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "received": true, "type": "domain.updated" })
    );
}

#[tokio::test]
async fn test_subscribe_then_click_round_trip() {
    let store: Arc<InMemoryResend> = Arc::default();
    let router = app(config(Some(SECRET)), store.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            "/double-optin/subscribe",
            &json!({ "email": "jane@x.com", "name": "Jane" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["contact_id"], json!("c1"));
    assert_eq!(body["email_id"], json!("e1"));
    assert!(store.contact("c1").unwrap().unsubscribed);
    assert_eq!(store.sent.lock().unwrap()[0].to, vec!["jane@x.com".to_string()]);

    let response = router
        .oneshot(signed_request("/double-optin/webhook", &clicked("jane@x.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!store.contact("c1").unwrap().unsubscribed);
}

#[tokio::test]
async fn test_subscribe_requires_email() {
    let response = app(config(Some(SECRET)), Arc::default())
        .oneshot(json_request("/double-optin/subscribe", &json!({ "email": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_route() {
    let store: Arc<InMemoryResend> = Arc::default();

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(json_request(
            "/send",
            &json!({ "to": "bob@x.com", "subject": "Hi", "message": "a < b" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true, "id": "e1" }));

    let sent = store.sent.lock().unwrap();
    assert_eq!(sent[0].html.as_deref(), Some("<p>a &lt; b</p>"));
}

#[tokio::test]
async fn test_subscribe_missing_email_field() {
    let store: Arc<InMemoryResend> = Arc::default();

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(json_request("/double-optin/subscribe", &json!({ "name": "Jane" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required field: email" })
    );
    assert!(store.contacts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_missing_fields() {
    let store: Arc<InMemoryResend> = Arc::default();

    let response = app(config(Some(SECRET)), store.clone())
        .oneshot(json_request("/send", &json!({ "to": "bob@x.com" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required fields: to, subject, message" })
    );
    assert!(store.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/send")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(config(Some(SECRET)), Arc::default())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_send_template_route() {
    let store: Arc<InMemoryResend> = Arc::default();
    let router = app(config(Some(SECRET)), store.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            "/send-template",
            &json!({ "to": "bob@x.com", "templateId": "tmpl_1", "variables": { "USER_NAME": "Bob" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    {
        let sent = store.sent.lock().unwrap();
        let template = sent[0].template.as_ref().unwrap();
        assert_eq!(template.id, "tmpl_1");
        assert_eq!(template.variables["USER_NAME"], json!("Bob"));
        assert!(sent[0].html.is_none());
    }

    let response = router
        .oneshot(json_request("/send-template", &json!({ "to": "bob@x.com" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing required fields: to, templateId" })
    );
}
