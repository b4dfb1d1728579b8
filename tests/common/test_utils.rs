#![allow(dead_code)]

// In-memory stand-ins for the database and the outside services, injected
// through the service constructors.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use flight_booking_backend::gateways::flight_provider::{parse_offers, FlightProvider, ProviderError};
use flight_booking_backend::gateways::mailer::{MailError, Mailer, OutgoingEmail};
use flight_booking_backend::gateways::payment::{parse_webhook_event, PaymentError, PaymentGateway};
use flight_booking_backend::gateways::reservation::{ReservationApi, ReservationError};
use flight_booking_backend::models::airline::{Airline, ProviderAirline};
use flight_booking_backend::models::flight::{FlightOffer, FlightSearchParams, Location};
use flight_booking_backend::models::payment::{CheckoutRequest, CheckoutSession, WebhookEvent};
use flight_booking_backend::models::staff::{StaffId, StaffUser};
use flight_booking_backend::models::ticket::{
    AmountPaid, FulfillmentState, PaymentState, SessionId, TicketPayload, TicketRequest,
};
use flight_booking_backend::repositories::{AirlineRepository, PaymentTransition, StaffDirectory, TicketRepository};
use flight_booking_backend::utils::error::{AppError, AppResult};

// ---------------------------------------------------------------- tickets

#[derive(Default)]
pub struct InMemoryTicketRepo {
    tickets: Mutex<Vec<TicketRequest>>,
    writes: AtomicUsize,
}

impl InMemoryTicketRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of mutating calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.tickets.lock().unwrap().len()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<TicketRequest> {
        self.tickets.lock().unwrap().iter().find(|t| &t.session_id == session_id).cloned()
    }

    fn touch(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepo {
    async fn insert(&self, ticket: &TicketRequest) -> AppResult<()> {
        self.touch();
        let mut tickets = self.tickets.lock().unwrap();
        if tickets.iter().any(|t| t.session_id == ticket.session_id) {
            return Err(AppError::DatabaseError("duplicate session_id".into()));
        }
        tickets.push(ticket.clone());
        Ok(())
    }

    async fn find_by_session(&self, session_id: &SessionId) -> AppResult<Option<TicketRequest>> {
        Ok(self.get(session_id))
    }

    async fn list(&self, offset: u64, limit: u32) -> AppResult<(Vec<TicketRequest>, u64)> {
        let tickets = self.tickets.lock().unwrap();
        // Newest first: insertion order reversed
        let page = tickets
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, tickets.len() as u64))
    }

    async fn mark_paid(&self, session_id: &SessionId, amount: &AmountPaid) -> AppResult<PaymentTransition> {
        self.touch();
        let mut tickets = self.tickets.lock().unwrap();
        let Some(ticket) = tickets.iter_mut().find(|t| &t.session_id == session_id) else {
            return Ok(PaymentTransition::NotFound);
        };
        if ticket.payment_status == PaymentState::Paid {
            return Ok(PaymentTransition::AlreadyPaid(ticket.clone()));
        }
        ticket.payment_status = PaymentState::Paid;
        ticket.order_status = FulfillmentState::Pending;
        ticket.amount_paid = amount.clone();
        ticket.updated_at = Utc::now();
        Ok(PaymentTransition::Applied(ticket.clone()))
    }

    async fn attach_pnr(&self, session_id: &SessionId, pnr: &str) -> AppResult<bool> {
        self.touch();
        let mut tickets = self.tickets.lock().unwrap();
        match tickets.iter_mut().find(|t| &t.session_id == session_id) {
            Some(ticket) if ticket.pnr.is_none() => {
                ticket.pnr = Some(pnr.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_fulfillment(
        &self,
        session_id: &SessionId,
        state: FulfillmentState,
        handled_by: &StaffId,
    ) -> AppResult<Option<TicketRequest>> {
        self.touch();
        let mut tickets = self.tickets.lock().unwrap();
        Ok(tickets.iter_mut().find(|t| &t.session_id == session_id).map(|ticket| {
            ticket.order_status = state;
            ticket.handled_by = Some(*handled_by);
            ticket.clone()
        }))
    }

    async fn delete(&self, session_id: &SessionId) -> AppResult<bool> {
        self.touch();
        let mut tickets = self.tickets.lock().unwrap();
        let before = tickets.len();
        tickets.retain(|t| &t.session_id != session_id);
        Ok(tickets.len() != before)
    }
}

// ---------------------------------------------------------------- airlines

#[derive(Default)]
pub struct InMemoryAirlineRepo {
    airlines: Mutex<BTreeMap<String, Airline>>,
}

impl InMemoryAirlineRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, airline: Airline) {
        self.airlines.lock().unwrap().insert(airline.iata_code.clone(), airline);
    }

    pub fn codes(&self) -> Vec<String> {
        self.airlines.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl AirlineRepository for InMemoryAirlineRepo {
    async fn find(&self, iata_code: &str) -> AppResult<Option<Airline>> {
        Ok(self.airlines.lock().unwrap().get(iata_code).cloned())
    }

    async fn find_many(&self, iata_codes: &[String]) -> AppResult<Vec<Airline>> {
        let airlines = self.airlines.lock().unwrap();
        Ok(iata_codes.iter().filter_map(|code| airlines.get(code).cloned()).collect())
    }

    async fn insert(&self, airline: &Airline) -> AppResult<bool> {
        let mut airlines = self.airlines.lock().unwrap();
        if airlines.contains_key(&airline.iata_code) {
            return Ok(false);
        }
        airlines.insert(airline.iata_code.clone(), airline.clone());
        Ok(true)
    }

    async fn insert_many(&self, batch: &[Airline]) -> AppResult<u64> {
        let mut airlines = self.airlines.lock().unwrap();
        let mut inserted = 0;
        for airline in batch {
            if !airlines.contains_key(&airline.iata_code) {
                airlines.insert(airline.iata_code.clone(), airline.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

pub fn airline(iata: &str, name: &str) -> Airline {
    Airline {
        iata_code: iata.to_string(),
        icao_code: format!("{iata}X"),
        business_name: name.to_string(),
        common_name: Some(name.to_string()),
    }
}

// ---------------------------------------------------------------- staff

#[derive(Default)]
pub struct FakeStaffDirectory {
    staff: Mutex<HashMap<String, StaffUser>>,
    lookups: AtomicUsize,
}

impl FakeStaffDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, status: &str) -> StaffId {
        let id = StaffId::new(Uuid::new_v4());
        self.staff.lock().unwrap().insert(
            id.to_string(),
            StaffUser {
                id: id.to_string(),
                username: format!("agent-{}", &id.to_string()[..8]),
                email: None,
                role: "STAFF".to_string(),
                status: status.to_string(),
            },
        );
        id
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StaffDirectory for FakeStaffDirectory {
    async fn find(&self, id: &StaffId) -> AppResult<Option<StaffUser>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.staff.lock().unwrap().get(&id.to_string()).cloned())
    }
}

// ---------------------------------------------------------------- flight provider

#[derive(Default)]
pub struct MockFlightProvider {
    offers: Mutex<Vec<Value>>,
    airlines: Mutex<Vec<ProviderAirline>>,
    airports: Mutex<Vec<Value>>,
    fail_searches: AtomicBool,
    fail_lookups: AtomicBool,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    looked_up: Mutex<Vec<Vec<String>>>,
}

impl MockFlightProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_offers(&self, offers: Vec<Value>) {
        *self.offers.lock().unwrap() = offers;
    }

    pub fn with_airlines(&self, airlines: Vec<ProviderAirline>) {
        *self.airlines.lock().unwrap() = airlines;
    }

    pub fn with_airports(&self, airports: Vec<Value>) {
        *self.airports.lock().unwrap() = airports;
    }

    pub fn fail_searches(&self) {
        self.fail_searches.store(true, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn looked_up(&self) -> Vec<Vec<String>> {
        self.looked_up.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlightProvider for MockFlightProvider {
    async fn search_offers(&self, _params: &FlightSearchParams) -> Result<Vec<FlightOffer>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(ProviderError::Status { status: 503, body: "maintenance".into() });
        }
        Ok(parse_offers(self.offers.lock().unwrap().clone()))
    }

    async fn lookup_airlines(&self, codes: &[String]) -> Result<Vec<ProviderAirline>, ProviderError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.looked_up.lock().unwrap().push(codes.to_vec());
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ProviderError::Status { status: 429, body: "quota".into() });
        }
        Ok(self
            .airlines
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.iata_code.as_ref().is_some_and(|c| codes.contains(c)))
            .cloned()
            .collect())
    }

    async fn search_airports(&self, _keyword: &str) -> Result<Vec<Location>, ProviderError> {
        self.airports
            .lock()
            .unwrap()
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| ProviderError::Malformed(e.to_string())))
            .collect()
    }
}

pub fn provider_airline(iata: &str, icao: Option<&str>, name: &str) -> ProviderAirline {
    ProviderAirline {
        iata_code: Some(iata.to_string()),
        icao_code: icao.map(String::from),
        business_name: Some(name.to_string()),
        common_name: Some(name.to_string()),
    }
}

fn segment(from: &str, to: &str, carrier: &str) -> Value {
    json!({
        "departure": { "iataCode": from, "at": "2025-06-01T08:00:00" },
        "arrival": { "iataCode": to, "at": "2025-06-01T12:00:00" },
        "carrierCode": carrier,
        "number": "100",
        "numberOfStops": 0
    })
}

/// Raw provider offer with the given segment count per itinerary.
pub fn offer(id: &str, segments_per_itinerary: &[usize], carrier: &str) -> Value {
    let itineraries: Vec<Value> = segments_per_itinerary
        .iter()
        .map(|&count| {
            let segments: Vec<Value> = (0..count).map(|_| segment("DXB", "LHR", carrier)).collect();
            json!({ "duration": "PT8H", "segments": segments })
        })
        .collect();

    json!({
        "type": "flight-offer",
        "id": id,
        "itineraries": itineraries,
        "price": { "currency": "USD", "total": "512.40", "grandTotal": "512.40" },
        "validatingAirlineCodes": [carrier]
    })
}

// ---------------------------------------------------------------- payments

pub const VALID_SIGNATURE: &str = "t=1700000000,v1=trusted";

#[derive(Default)]
pub struct MockPaymentGateway {
    checkouts: Mutex<Vec<CheckoutRequest>>,
}

impl MockPaymentGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        self.checkouts.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: format!("cs_test_{}", request.session_id),
            url: format!("https://checkout.example.com/pay/{}", request.session_id),
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, PaymentError> {
        if signature_header != VALID_SIGNATURE {
            return Err(PaymentError::InvalidSignature);
        }
        parse_webhook_event(payload)
    }
}

pub fn checkout_completed_event(session_id: &SessionId, amount_total: i64) -> Vec<u8> {
    json!({
        "id": "evt_test",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "currency": "usd",
            "amount_total": amount_total,
            "customer_email": "ada@example.com",
            "metadata": {
                "sessionId": session_id.to_string(),
                "customer": "Ada Lovelace",
                "ticketType": "Return",
                "departureCity": "DXB",
                "arrivalCity": "LHR",
                "departureDate": "2025-06-01"
            }
        } }
    })
    .to_string()
    .into_bytes()
}

// ---------------------------------------------------------------- reservations

pub struct CountingReservationApi {
    calls: AtomicUsize,
    pnr: Option<String>,
    fail: bool,
}

impl CountingReservationApi {
    pub fn issuing(pnr: &str) -> Arc<Self> {
        Arc::new(CountingReservationApi { calls: AtomicUsize::new(0), pnr: Some(pnr.to_string()), fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(CountingReservationApi { calls: AtomicUsize::new(0), pnr: None, fail: true })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReservationApi for CountingReservationApi {
    async fn create_reservation(&self, _ticket: &TicketRequest) -> Result<Option<String>, ReservationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReservationError::Status { status: 502, body: "gds offline".into() });
        }
        Ok(self.pnr.clone())
    }
}

// ---------------------------------------------------------------- email

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------- payloads

pub fn ticket_payload_json() -> Value {
    json!({
        "type": "Return",
        "passengers": [
            { "type": "adult", "title": "Ms", "firstName": "Ada", "lastName": "Lovelace" }
        ],
        "email": "ada@example.com",
        "phoneNumber": { "code": "+44", "digits": "7700900123" },
        "from": "Dubai (DXB)",
        "to": "London (LHR)",
        "departureDate": "2025-06-01",
        "returnDate": "2025-06-10",
        "quantity": { "adults": 1, "children": 0, "infants": 0 },
        "ticketValidity": "7 Days",
        "ticketAvailability": { "immediate": true },
        "flightDetails": {},
        "totalAmount": "45.99"
    })
}

pub fn ticket_payload() -> TicketPayload {
    serde_json::from_value(ticket_payload_json()).expect("sample payload deserializes")
}
