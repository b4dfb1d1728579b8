use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::gateways::flight_provider::FlightProvider;
use crate::models::airline::{Airline, AirlineAdmission, ProviderAirline};
use crate::models::flight::{EnrichedOffer, FlightOffer, FlightSearchParams, FlightSearchQuery, FlightSearchResponse, Location};
use crate::models::ticket::{Quantity, TripType};
use crate::repositories::AirlineRepository;
use crate::utils::error::{AppError, AppResult};
use crate::utils::iata::extract_iata_code;

/// Offers whose outbound itinerary is longer than this are not shown.
pub const MAX_SEGMENTS: usize = 2;

pub struct FlightService {
    provider: Arc<dyn FlightProvider>,
    airlines: Arc<dyn AirlineRepository>,
}

impl FlightService {
    pub fn new(provider: Arc<dyn FlightProvider>, airlines: Arc<dyn AirlineRepository>) -> Self {
        FlightService { provider, airlines }
    }

    // Validate the query string before anything leaves the process
    pub fn build_search_params(query: FlightSearchQuery) -> AppResult<FlightSearchParams> {
        let non_empty = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(from), Some(to), Some(departure_date)) =
            (non_empty(query.from), non_empty(query.to), non_empty(query.departure_date))
        else {
            return Err(AppError::ValidationError(
                "Please provide the departure destination, arrival destination, and the departure date".into(),
            ));
        };

        let departure_date = parse_date("departureDate", &departure_date)?;
        let return_date = non_empty(query.return_date)
            .map(|raw| parse_date("returnDate", &raw))
            .transpose()?;

        let trip_type = match non_empty(query.trip_type) {
            Some(raw) if raw.eq_ignore_ascii_case("return") => TripType::Return,
            _ => TripType::OneWay,
        };

        let defaults = Quantity::default();
        let passengers = Quantity {
            adults: query.adults.unwrap_or(defaults.adults),
            children: query.children.unwrap_or(defaults.children),
            infants: query.infants.unwrap_or(defaults.infants),
        };
        if passengers.adults == 0 {
            return Err(AppError::ValidationError("At least one adult passenger is required".into()));
        }

        Ok(FlightSearchParams {
            origin_location_code: extract_iata_code(&from),
            destination_location_code: extract_iata_code(&to),
            departure_date,
            return_date: return_date.filter(|_| trip_type == TripType::Return),
            trip_type,
            passengers,
        })
    }

    // Search offers, keep short itineraries, attach airline metadata
    pub async fn search_flights(&self, query: FlightSearchQuery) -> AppResult<FlightSearchResponse> {
        let params = Self::build_search_params(query)?;

        let mut offers: Vec<FlightOffer> = self
            .provider
            .search_offers(&params)
            .await?
            .into_iter()
            .filter(|offer| offer.outbound_segments() <= MAX_SEGMENTS)
            .collect();

        tracing::debug!(
            from = %params.origin_location_code,
            to = %params.destination_location_code,
            offers = offers.len(),
            "flight offers received"
        );

        if offers.is_empty() {
            return Ok(FlightSearchResponse {
                message: "No flights available".to_string(),
                flights: Vec::new(),
            });
        }

        // sort_by_key is stable, so provider order breaks ties
        offers.sort_by_key(FlightOffer::outbound_segments);

        let directory = self.airline_directory(&offers).await;
        let flights = offers
            .into_iter()
            .map(|offer| {
                let airline_details = offer
                    .validating_airline_codes
                    .iter()
                    .map(|code| directory.get(&code.to_uppercase()).cloned())
                    .collect();
                EnrichedOffer { offer, airline_details }
            })
            .collect();

        Ok(FlightSearchResponse {
            message: "Flights list fetched successfully".to_string(),
            flights,
        })
    }

    /// Cached airline records for every validating carrier, fetching and caching
    /// the missing ones in one provider call. Failures only cost the enrichment.
    pub async fn airline_directory(&self, offers: &[FlightOffer]) -> HashMap<String, Airline> {
        let codes: Vec<String> = offers
            .iter()
            .flat_map(|offer| offer.validating_airline_codes.iter())
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if codes.is_empty() {
            return HashMap::new();
        }

        let mut directory: HashMap<String, Airline> = match self.airlines.find_many(&codes).await {
            Ok(found) => found.into_iter().map(|a| (a.iata_code.clone(), a)).collect(),
            Err(err) => {
                tracing::warn!(error = %err, "airline cache lookup failed");
                HashMap::new()
            }
        };

        let missing: Vec<String> = codes.into_iter().filter(|code| !directory.contains_key(code)).collect();
        if missing.is_empty() {
            return directory;
        }

        let fetched: Vec<Airline> = match self.provider.lookup_airlines(&missing).await {
            Ok(records) => records.into_iter().filter_map(ProviderAirline::resolve).collect(),
            Err(err) => {
                tracing::warn!(error = %err, codes = ?missing, "airline lookup failed, returning offers without airline details");
                return directory;
            }
        };

        if !fetched.is_empty() {
            match self.airlines.insert_many(&fetched).await {
                Ok(inserted) => tracing::debug!(inserted, fetched = fetched.len(), "airline cache updated"),
                Err(err) => tracing::warn!(error = %err, "failed to cache airline records"),
            }
        }

        for airline in fetched {
            directory.insert(airline.iata_code.clone(), airline);
        }
        directory
    }

    // Store provider metadata for one airline, once
    pub async fn admit_airline(&self, iata_code: &str) -> AppResult<AirlineAdmission> {
        let code = iata_code.trim().to_uppercase();
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::ValidationError("Invalid airline code".into()));
        }

        if let Some(existing) = self.airlines.find(&code).await? {
            return Ok(AirlineAdmission::AlreadyExists(existing));
        }

        let records = self.provider.lookup_airlines(std::slice::from_ref(&code)).await?;
        let record = records
            .into_iter()
            .find(|r| r.iata_code.as_deref().map(str::trim).is_some_and(|c| c.eq_ignore_ascii_case(&code)));

        let Some(airline) = record.and_then(ProviderAirline::resolve) else {
            tracing::info!(iata_code = %code, "provider has no usable record for airline");
            return Ok(AirlineAdmission::NotFound);
        };

        if self.airlines.insert(&airline).await? {
            tracing::info!(iata_code = %code, "airline metadata saved");
            return Ok(AirlineAdmission::Saved(airline));
        }

        // Lost a race with a concurrent admission or search
        let stored = self.airlines.find(&code).await?.unwrap_or(airline);
        Ok(AirlineAdmission::AlreadyExists(stored))
    }

    pub async fn search_airports(&self, keyword: &str) -> AppResult<Vec<Location>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::ValidationError("Please provide a keyword".into()));
        }
        Ok(self.provider.search_airports(keyword).await?)
    }
}

fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid {field} format, expected YYYY-MM-DD")))
}
