//! Persistence seams. Services only see these traits; the MySQL
//! implementations live in the submodules.

pub mod airline_repo;
pub mod staff_repo;
pub mod ticket_repo;

use async_trait::async_trait;

use crate::models::airline::Airline;
use crate::models::staff::{StaffId, StaffUser};
use crate::models::ticket::{AmountPaid, FulfillmentState, SessionId, TicketRequest};
use crate::utils::error::AppResult;

/// Result of the conditional UNPAID → PAID write.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentTransition {
    /// This call performed the transition.
    Applied(TicketRequest),
    /// A previous delivery already did; nothing was written.
    AlreadyPaid(TicketRequest),
    NotFound,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert(&self, ticket: &TicketRequest) -> AppResult<()>;

    async fn find_by_session(&self, session_id: &SessionId) -> AppResult<Option<TicketRequest>>;

    /// Newest first. Returns the page and the total number of tickets.
    async fn list(&self, offset: u64, limit: u32) -> AppResult<(Vec<TicketRequest>, u64)>;

    /// Atomically marks the ticket paid unless it already is.
    async fn mark_paid(&self, session_id: &SessionId, amount: &AmountPaid) -> AppResult<PaymentTransition>;

    /// Sets the locator only if none is stored yet. Returns whether it was written.
    async fn attach_pnr(&self, session_id: &SessionId, pnr: &str) -> AppResult<bool>;

    async fn update_fulfillment(
        &self,
        session_id: &SessionId,
        state: FulfillmentState,
        handled_by: &StaffId,
    ) -> AppResult<Option<TicketRequest>>;

    async fn delete(&self, session_id: &SessionId) -> AppResult<bool>;
}

#[async_trait]
pub trait AirlineRepository: Send + Sync {
    async fn find(&self, iata_code: &str) -> AppResult<Option<Airline>>;

    async fn find_many(&self, iata_codes: &[String]) -> AppResult<Vec<Airline>>;

    /// Returns false when a record for the code already existed.
    async fn insert(&self, airline: &Airline) -> AppResult<bool>;

    /// Duplicates are skipped. Returns the number of rows written.
    async fn insert_many(&self, airlines: &[Airline]) -> AppResult<u64>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find(&self, id: &StaffId) -> AppResult<Option<StaffUser>>;
}
