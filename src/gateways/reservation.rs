use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ticket::{AmountPaid, TicketRequest, TicketSubmission};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("reservation service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("reservation service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Downstream system that turns a paid ticket request into a booking.
#[async_trait]
pub trait ReservationApi: Send + Sync {
    /// Returns the record locator when the reservation system issued one.
    async fn create_reservation(&self, ticket: &TicketRequest) -> Result<Option<String>, ReservationError>;
}

pub struct HttpReservationApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpReservationApi {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        HttpReservationApi {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationBody<'a> {
    session_id: String,
    #[serde(flatten)]
    ticket: &'a TicketSubmission,
    amount_paid: &'a AmountPaid,
}

#[derive(Deserialize)]
struct ReservationReply {
    pnr: Option<String>,
}

#[async_trait]
impl ReservationApi for HttpReservationApi {
    async fn create_reservation(&self, ticket: &TicketRequest) -> Result<Option<String>, ReservationError> {
        let body = ReservationBody {
            session_id: ticket.session_id.to_string(),
            ticket: &ticket.submission,
            amount_paid: &ticket.amount_paid,
        };

        let mut request = self.client.post(format!("{}/api/reservations", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReservationError::Status { status: status.as_u16(), body });
        }

        // A reply without a locator is still a successful reservation
        let reply: Option<ReservationReply> = response.json().await.ok();
        Ok(reply
            .and_then(|r| r.pnr)
            .map(|pnr| pnr.trim().to_string())
            .filter(|pnr| !pnr.is_empty()))
    }
}
