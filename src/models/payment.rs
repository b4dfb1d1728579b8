use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::ticket::SessionId;

/// Everything the provider needs to host a checkout page for one ticket request.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub session_id: SessionId,
    pub customer_email: String,
    pub description: String,
    pub currency: String,
    /// Minor units (cents)
    pub amount: i64,
    pub metadata: CheckoutMetadata,
}

/// Carried through the provider and echoed back in the completion webhook,
/// so confirmation emails need no second database read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub session_id: String,
    #[serde(default)]
    pub customer: String,
    pub ticket_type: Option<String>,
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
}

impl CheckoutMetadata {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("sessionId", self.session_id.clone()), ("customer", self.customer.clone())];
        let optional = [
            ("ticketType", &self.ticket_type),
            ("departureCity", &self.departure_city),
            ("arrivalCity", &self.arrival_city),
            ("departureDate", &self.departure_date),
            ("returnDate", &self.return_date),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A completed checkout, validated at the webhook boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    pub checkout_id: String,
    pub session_id: SessionId,
    pub currency: String,
    pub amount_total: i64,
    pub customer_email: Option<String>,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted(CompletedCheckout),
    Other { id: String, event_type: String },
}
