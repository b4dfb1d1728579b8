use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use crate::models::staff::StaffId;
use crate::utils::error::{AppError, AppResult};

/// Client-facing handle of a ticket request. Internal row ids never leave the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Unparseable ids cannot name any ticket, so they are reported as not found.
    pub fn parse(raw: &str) -> AppResult<Self> {
        raw.parse().map_err(|_| AppError::NotFound("Ticket not found".into()))
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(SessionId)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
pub enum TripType {
    #[default]
    #[serde(rename = "One Way")]
    #[strum(serialize = "One Way")]
    OneWay,
    #[serde(rename = "Return")]
    #[strum(serialize = "Return")]
    Return,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
pub enum TicketValidity {
    #[default]
    #[serde(rename = "2 Days")]
    #[strum(serialize = "2 Days")]
    TwoDays,
    #[serde(rename = "7 Days")]
    #[strum(serialize = "7 Days")]
    SevenDays,
    #[serde(rename = "14 Days")]
    #[strum(serialize = "14 Days")]
    FourteenDays,
}

// Payment axis of the lifecycle
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    #[default]
    Unpaid,
    Paid,
}

// Fulfillment axis, moved only by staff after the initial PENDING
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentState {
    #[default]
    Pending,
    Delivered,
    Contacted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    #[serde(rename = "type", default)]
    pub passenger_type: String,
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub last_name: String,
}

impl Passenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhoneNumber {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub digits: String,
}

// At most nine travellers of each kind per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Quantity {
    #[validate(range(max = 9))]
    #[serde(default)]
    pub adults: u32,
    #[validate(range(max = 9))]
    #[serde(default)]
    pub children: u32,
    #[validate(range(max = 9))]
    #[serde(default)]
    pub infants: u32,
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity { adults: 1, children: 0, infants: 0 }
    }
}

impl Quantity {
    pub fn total(&self) -> u32 {
        self.adults.saturating_add(self.children).saturating_add(self.infants)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketAvailability {
    #[serde(default)]
    pub immediate: bool,
    pub receipt_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpointSnapshot {
    pub iata_code: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AirlineBadge {
    pub name: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSnapshot {
    pub departure: SegmentEndpointSnapshot,
    pub arrival: SegmentEndpointSnapshot,
    pub duration: Option<String>,
    #[serde(default)]
    pub carrier_code: String,
    #[serde(default)]
    pub flight_number: String,
    pub aircraft_code: Option<String>,
    pub airline: Option<AirlineBadge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItinerarySnapshot {
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentSnapshot>,
}

impl ItinerarySnapshot {
    /// One-line description used in notification emails, e.g. `EK1 DXB 08:00 → LHR 12:30`.
    pub fn summary(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                format!(
                    "{}{} {} {} → {} {}",
                    s.carrier_code, s.flight_number, s.departure.iata_code, s.departure.time, s.arrival.iata_code, s.arrival.time
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Itinerary captured when the request is made. Never rewritten afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlightSnapshot {
    pub departure_flight: Option<ItinerarySnapshot>,
    pub return_flight: Option<ItinerarySnapshot>,
}

// Inbound body of POST /ticket
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(rename = "type", default)]
    pub trip_type: TripType,
    #[validate(length(min = 1), nested)]
    #[serde(default)]
    pub passengers: Vec<Passenger>,
    #[validate(email)]
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: PhoneNumber,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub from: String,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub to: String,
    #[validate(required)]
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    #[validate(nested)]
    #[serde(default)]
    pub quantity: Quantity,
    pub message: Option<String>,
    #[serde(default)]
    pub ticket_validity: TicketValidity,
    #[serde(default)]
    pub ticket_availability: TicketAvailability,
    #[serde(default)]
    pub flight_details: FlightSnapshot,
    pub total_amount: Option<Decimal>,
}

// `length(min = 1)` alone lets whitespace through
fn blank_fields(from: &str, to: &str, passengers: &[Passenger]) -> Vec<&'static str> {
    let mut blank = Vec::new();
    if from.is_empty() {
        blank.push("from");
    }
    if to.is_empty() {
        blank.push("to");
    }
    if passengers.iter().any(|p| p.first_name.is_empty()) {
        blank.push("passengers.firstName");
    }
    if passengers.iter().any(|p| p.last_name.is_empty()) {
        blank.push("passengers.lastName");
    }
    blank
}

impl TicketPayload {
    pub fn into_submission(self) -> AppResult<TicketSubmission> {
        self.validate()?;

        let departure_date = self
            .departure_date
            .ok_or_else(|| AppError::ValidationError("Missing or invalid fields: departure_date".into()))?;

        if self.trip_type == TripType::Return && self.return_date.is_none() {
            return Err(AppError::ValidationError("A return ticket needs a returnDate".into()));
        }

        let from = self.from.trim().to_string();
        let to = self.to.trim().to_string();
        let passengers: Vec<Passenger> = self
            .passengers
            .into_iter()
            .map(|p| Passenger {
                passenger_type: p.passenger_type.trim().to_string(),
                title: p.title.trim().to_string(),
                first_name: p.first_name.trim().to_string(),
                last_name: p.last_name.trim().to_string(),
            })
            .collect();

        let blank = blank_fields(&from, &to, &passengers);
        if !blank.is_empty() {
            return Err(AppError::ValidationError(format!("Missing or invalid fields: {}", blank.join(", "))));
        }

        if let Some(amount) = self.total_amount {
            if amount.is_sign_negative() {
                return Err(AppError::ValidationError("totalAmount cannot be negative".into()));
            }
        }

        Ok(TicketSubmission {
            trip_type: self.trip_type,
            passengers,
            email: self.email.trim().to_string(),
            phone_number: self.phone_number,
            from,
            to,
            departure_date,
            return_date: self.return_date.filter(|_| self.trip_type == TripType::Return),
            quantity: self.quantity,
            message: self.message,
            ticket_validity: self.ticket_validity,
            ticket_availability: self.ticket_availability,
            flight_details: self.flight_details,
            total_amount: self.total_amount,
        })
    }
}

/// The validated, immutable part of a ticket request, stored as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketSubmission {
    #[serde(rename = "type")]
    pub trip_type: TripType,
    pub passengers: Vec<Passenger>,
    pub email: String,
    pub phone_number: PhoneNumber,
    pub from: String,
    pub to: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub quantity: Quantity,
    pub message: Option<String>,
    pub ticket_validity: TicketValidity,
    pub ticket_availability: TicketAvailability,
    pub flight_details: FlightSnapshot,
    pub total_amount: Option<Decimal>,
}

impl TicketSubmission {
    pub fn lead_passenger(&self) -> Option<&Passenger> {
        self.passengers.first()
    }

    pub fn lead_passenger_name(&self) -> String {
        self.lead_passenger().map(Passenger::full_name).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AmountPaid {
    pub currency: String,
    pub amount: Decimal,
}

impl Default for AmountPaid {
    fn default() -> Self {
        AmountPaid { currency: String::new(), amount: Decimal::ZERO }
    }
}

impl AmountPaid {
    /// Provider amounts arrive in minor units (cents).
    pub fn from_minor_units(currency: &str, minor: i64) -> Self {
        AmountPaid {
            currency: currency.to_uppercase(),
            amount: Decimal::new(minor, 2).round_dp(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub submission: TicketSubmission,
    pub payment_status: PaymentState,
    pub order_status: FulfillmentState,
    pub amount_paid: AmountPaid,
    pub pnr: Option<String>,
    pub handled_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketRequest {
    pub fn new(submission: TicketSubmission) -> Self {
        let now = Utc::now();
        TicketRequest {
            session_id: SessionId::generate(),
            submission,
            payment_status: PaymentState::Unpaid,
            order_status: FulfillmentState::Pending,
            amount_paid: AmountPaid::default(),
            pnr: None,
            handled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentState::Paid
    }
}

// Body of PUT /ticket/<sessionId>/status
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub user_id: String,
    pub order_status: FulfillmentState,
}

// Body of POST /ticket/pay
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub session_id: String,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub passenger_name: String,
    pub currency: String,
    pub amount: Decimal,
    pub pnr: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TicketPage {
    pub data: Vec<TicketRequest>,
    pub pagination: Pagination,
}
