use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::airline::ProviderAirline;
use crate::models::flight::{FlightOffer, FlightSearchParams, Location};
use crate::models::ticket::TripType;
use crate::utils::retry::{retry_with_backoff, RetryPolicy, Transient};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("flight provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("flight provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("flight provider response malformed: {0}")]
    Malformed(String),
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            // 401 means our cached token expired; the retry fetches a fresh one
            ProviderError::Status { status, .. } => *status == 401 || *status == 429 || *status >= 500,
            ProviderError::Malformed(_) => false,
        }
    }
}

/// Flight-data provider used for search and reference data.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    async fn search_offers(&self, params: &FlightSearchParams) -> Result<Vec<FlightOffer>, ProviderError>;

    /// One batched call for any number of airline codes.
    async fn lookup_airlines(&self, codes: &[String]) -> Result<Vec<ProviderAirline>, ProviderError>;

    async fn search_airports(&self, keyword: &str) -> Result<Vec<Location>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Amadeus self-service REST client (OAuth2 client credentials).
pub struct AmadeusClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    retry: RetryPolicy,
}

impl AmadeusClient {
    pub fn new(base_url: &str, client_id: String, client_secret: String) -> Self {
        AmadeusClient {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            token: Mutex::new(None),
            retry: RetryPolicy::default(),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("token response: {e}")))?;

        // Refresh a minute early
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        let envelope: DataEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("{path}: {e}")))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    async fn search_offers(&self, params: &FlightSearchParams) -> Result<Vec<FlightOffer>, ProviderError> {
        let mut query = vec![
            ("originLocationCode", params.origin_location_code.clone()),
            ("destinationLocationCode", params.destination_location_code.clone()),
            ("departureDate", params.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", params.passengers.adults.to_string()),
            ("children", params.passengers.children.to_string()),
            ("infants", params.passengers.infants.to_string()),
        ];
        if params.trip_type == TripType::Return {
            if let Some(return_date) = params.return_date {
                query.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
            }
        }

        let raw: Vec<Value> = retry_with_backoff(&self.retry, "amadeus.flight_offers", || {
            self.get_data("/v2/shopping/flight-offers", &query)
        })
        .await?;

        Ok(parse_offers(raw))
    }

    async fn lookup_airlines(&self, codes: &[String]) -> Result<Vec<ProviderAirline>, ProviderError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let query = [("airlineCodes", codes.join(","))];
        retry_with_backoff(&self.retry, "amadeus.airlines", || {
            self.get_data("/v1/reference-data/airlines", &query)
        })
        .await
    }

    async fn search_airports(&self, keyword: &str) -> Result<Vec<Location>, ProviderError> {
        let query = [("subType", "AIRPORT".to_string()), ("keyword", keyword.to_string())];
        retry_with_backoff(&self.retry, "amadeus.locations", || {
            self.get_data("/v1/reference-data/locations", &query)
        })
        .await
    }
}

/// Maps raw offers into typed ones, dropping any the provider sent half-formed.
pub fn parse_offers(raw: Vec<Value>) -> Vec<FlightOffer> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<FlightOffer>(value) {
            Ok(offer) if offer.is_well_formed() => Some(offer),
            Ok(offer) => {
                tracing::warn!(offer_id = %offer.id, "dropping offer without segments");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed flight offer");
                None
            }
        })
        .collect()
}
