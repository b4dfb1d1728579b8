use chrono::NaiveDate;
use rocket::FromForm;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::airline::Airline;
use crate::models::ticket::{Quantity, TripType};

// Query string of GET /flights
#[derive(Debug, Clone, Default, FromForm, JsonSchema)]
pub struct FlightSearchQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[field(name = "departureDate")]
    #[schemars(rename = "departureDate")]
    pub departure_date: Option<String>,
    #[field(name = "returnDate")]
    #[schemars(rename = "returnDate")]
    pub return_date: Option<String>,
    #[field(name = "type")]
    #[schemars(rename = "type")]
    pub trip_type: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub infants: Option<u32>,
}

/// Validated search parameters in the provider's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSearchParams {
    pub origin_location_code: String,
    pub destination_location_code: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub passengers: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    pub iata_code: String,
    pub terminal: Option<String>,
    pub at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Aircraft {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
    pub carrier_code: String,
    pub number: String,
    pub duration: Option<String>,
    pub aircraft: Option<Aircraft>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Itinerary {
    pub duration: Option<String>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferPrice {
    pub currency: String,
    pub total: String,
    pub grand_total: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A flight offer as returned by the provider. Unknown fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: String,
    pub itineraries: Vec<Itinerary>,
    pub price: OfferPrice,
    #[serde(default)]
    pub validating_airline_codes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlightOffer {
    pub fn is_well_formed(&self) -> bool {
        !self.itineraries.is_empty() && self.itineraries.iter().all(|i| !i.segments.is_empty())
    }

    /// Segment count of the outbound itinerary.
    pub fn outbound_segments(&self) -> usize {
        self.itineraries.first().map(|i| i.segments.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedOffer {
    #[serde(flatten)]
    pub offer: FlightOffer,
    /// One entry per validating airline code, `null` when the airline is unknown.
    pub airline_details: Vec<Option<Airline>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FlightSearchResponse {
    pub message: String,
    pub flights: Vec<EnrichedOffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationAddress {
    pub city_name: Option<String>,
    pub city_code: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub sub_type: String,
    pub name: String,
    pub iata_code: String,
    pub detailed_name: Option<String>,
    pub address: Option<LocationAddress>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
