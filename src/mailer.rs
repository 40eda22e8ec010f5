use crate::db::ContactForOutbox;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

const MAILER_API_BASE: &str = "https://api.resend.com/";

/// Transactional email provider client. The provider is an opaque external
/// collaborator; this wraps its JSON API behind [`Mailer`] so the outbox
/// worker and tests can substitute a fake.
#[derive(Clone)]
pub struct HttpMailer {
    http: Client,
    base_url: Url,
    token: String,
    from_address: String,
    contact_recipient: String,
}

impl fmt::Debug for HttpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMailer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver the "new contact message" notification to the shop owner.
    /// Returns the provider's message id.
    async fn send_contact_email(&self, contact: &ContactForOutbox) -> Result<String>;
}

impl HttpMailer {
    pub fn new(token: String, from_address: String, contact_recipient: String) -> Self {
        let base_url = Url::parse(MAILER_API_BASE).expect("valid default mailer URL");
        Self::with_base_url(token, from_address, contact_recipient, base_url)
    }

    pub fn with_base_url(
        token: String,
        from_address: String,
        contact_recipient: String,
        base_url: Url,
    ) -> Self {
        let http = Client::builder()
            .user_agent("optica-cms/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
            from_address,
            contact_recipient,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self::new(
            cfg.mailer.api_token.clone(),
            cfg.mailer.from_address.clone(),
            cfg.mailer.contact_recipient.clone(),
        )
    }

    pub fn build_request(&self, body: &Value) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join("emails")
            .context("invalid mailer base URL")?;
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(body)
            .build()
            .context("failed to build mailer request")
    }

    async fn execute_send(&self, body: Value) -> Result<String> {
        let request = self.build_request(&body)?;
        debug!(url=%request.url(), "sending mailer request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach email provider")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("received 429 from email provider: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("email provider error {}: {}", status, body));
        }

        let payload: SendMessageResponse =
            res.json().await.context("invalid mailer response")?;
        Ok(payload.id)
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_contact_email(&self, contact: &ContactForOutbox) -> Result<String> {
        let body = build_contact_email_request(
            &self.from_address,
            &self.contact_recipient,
            contact,
        );
        self.execute_send(body).await
    }
}

/// Build the provider request body for a contact notification. Pure so it
/// can be unit-tested without a network.
pub fn build_contact_email_request(
    from_address: &str,
    recipient: &str,
    contact: &ContactForOutbox,
) -> Value {
    let mut text = format!(
        "New contact message from {} <{}>",
        contact.name, contact.email
    );
    if let Some(phone) = contact.phone.as_deref().filter(|p| !p.is_empty()) {
        text.push_str(&format!("\nPhone: {}", phone));
    }
    text.push_str("\n\n");
    text.push_str(&contact.message);

    json!({
        "from": from_address,
        "to": recipient,
        "reply_to": contact.email,
        "subject": format!("Contact form [{}]", contact.reference),
        "text": text,
    })
}

#[derive(Deserialize)]
struct SendMessageResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_contact() -> ContactForOutbox {
        ContactForOutbox {
            reference: "ref-1234".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: Some("555-0101".into()),
            message: "Do you stock titanium frames?".into(),
        }
    }

    #[test]
    fn request_body_includes_all_fields() {
        let body =
            build_contact_email_request("noreply@optica.example", "owner@optica.example", &sample_contact());
        assert_eq!(body["from"], "noreply@optica.example");
        assert_eq!(body["to"], "owner@optica.example");
        assert_eq!(body["reply_to"], "ana@example.com");
        assert_eq!(body["subject"], "Contact form [ref-1234]");
        let text = body["text"].as_str().unwrap();
        assert!(text.contains("Ana <ana@example.com>"));
        assert!(text.contains("Phone: 555-0101"));
        assert!(text.contains("titanium frames"));
    }

    #[test]
    fn request_body_omits_missing_phone() {
        let mut contact = sample_contact();
        contact.phone = None;
        let body = build_contact_email_request("a@b.c", "d@e.f", &contact);
        assert!(!body["text"].as_str().unwrap().contains("Phone:"));
    }

    #[test]
    fn build_request_sets_headers() {
        let mailer = HttpMailer::new("token".into(), "a@b.c".into(), "d@e.f".into());
        let body = json!({ "sample": true });
        let request = mailer.build_request(&body).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/emails");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer token"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }
}
