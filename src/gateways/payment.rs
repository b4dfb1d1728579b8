use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

use crate::models::payment::{CheckoutMetadata, CheckoutRequest, CheckoutSession, CompletedCheckout, WebhookEvent};
use crate::models::ticket::SessionId;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Signed webhooks further than this from our clock are treated as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("payment provider response malformed: {0}")]
    MalformedResponse(String),

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    /// `payload` must be the body exactly as received; any re-serialization breaks the signature.
    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, PaymentError>;
}

pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: String, webhook_secret: String, success_url: String, cancel_url: String) -> Self {
        StripeGateway {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            webhook_secret,
            success_url,
            cancel_url,
        }
    }

    /// Checks a `t=<unix>,v1=<hex>[,v1=<hex>…]` header against the raw payload.
    pub fn verify_signature(&self, payload: &[u8], signature_header: &str, now: i64) -> Result<(), PaymentError> {
        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<Vec<u8>> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
        // Header timestamps are untrusted; stale and future-dated ones are both rejected
        let within_tolerance = now
            .checked_sub(timestamp)
            .is_some_and(|age| (-SIGNATURE_TOLERANCE_SECS..=SIGNATURE_TOLERANCE_SECS).contains(&age));
        if signatures.is_empty() || !within_tolerance {
            return Err(PaymentError::InvalidSignature);
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures.iter().any(|candidate| mac.clone().verify_slice(candidate).is_ok());
        if matched {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature)
        }
    }

    fn checkout_form(&self, request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "success_url".to_string(),
                format!("{}?sessionId={}", self.success_url, request.session_id),
            ),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("client_reference_id".to_string(), request.session_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("line_items[0][price_data][currency]".to_string(), request.currency.to_lowercase()),
            ("line_items[0][price_data][unit_amount]".to_string(), request.amount.to_string()),
            ("line_items[0][price_data][product_data][name]".to_string(), request.description.clone()),
        ];
        for (key, value) in request.metadata.to_pairs() {
            form.push((format!("metadata[{key}]"), value));
        }
        form
    }
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&self.checkout_form(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Status { status: status.as_u16(), body });
        }

        let created: CreatedSession = response
            .json()
            .await
            .map_err(|e| PaymentError::MalformedResponse(e.to_string()))?;
        let url = created
            .url
            .ok_or_else(|| PaymentError::MalformedResponse(format!("checkout session {} has no url", created.id)))?;

        Ok(CheckoutSession { id: created.id, url })
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, PaymentError> {
        self.verify_signature(payload, signature_header, chrono::Utc::now().timestamp())?;
        parse_webhook_event(payload)
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct RawCustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    currency: Option<String>,
    amount_total: Option<i64>,
    customer_email: Option<String>,
    customer_details: Option<RawCustomerDetails>,
    #[serde(default)]
    metadata: Option<CheckoutMetadata>,
}

/// Parses an already-verified event body into a typed event.
pub fn parse_webhook_event(payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
    let event: RawEvent = serde_json::from_slice(payload).map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;

    if event.event_type != CHECKOUT_COMPLETED {
        return Ok(WebhookEvent::Other { id: event.id, event_type: event.event_type });
    }

    let session: RawCheckoutSession =
        serde_json::from_value(event.data.object).map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;

    let metadata = session
        .metadata
        .ok_or_else(|| PaymentError::MalformedEvent(format!("checkout {} carries no metadata", session.id)))?;
    let session_id: SessionId = metadata
        .session_id
        .parse()
        .map_err(|_| PaymentError::MalformedEvent(format!("checkout {} has an invalid sessionId", session.id)))?;
    let currency = session
        .currency
        .filter(|c| !c.is_empty())
        .ok_or_else(|| PaymentError::MalformedEvent(format!("checkout {} has no currency", session.id)))?;
    let amount_total = session
        .amount_total
        .filter(|amount| *amount >= 0)
        .ok_or_else(|| PaymentError::MalformedEvent(format!("checkout {} has no amount_total", session.id)))?;
    let customer_email = session
        .customer_email
        .or_else(|| session.customer_details.and_then(|d| d.email));

    Ok(WebhookEvent::CheckoutCompleted(CompletedCheckout {
        checkout_id: session.id,
        session_id,
        currency: currency.to_uppercase(),
        amount_total,
        customer_email,
        metadata,
    }))
}
