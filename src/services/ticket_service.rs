use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::gateways::payment::PaymentGateway;
use crate::gateways::reservation::ReservationApi;
use crate::models::payment::{CheckoutMetadata, CheckoutRequest, CheckoutSession, CompletedCheckout, WebhookEvent};
use crate::models::staff::{StaffId, StaffUser};
use crate::models::ticket::{
    AmountPaid, Pagination, PaymentInfo, PaymentRequest, SessionId, StatusUpdateRequest, TicketPage, TicketPayload,
    TicketRequest,
};
use crate::repositories::{PaymentTransition, StaffDirectory, TicketRepository};
use crate::services::notification_service::{Notification, NotificationService};
use crate::utils::error::{AppError, AppResult, BestEffort};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 150;

pub struct TicketCreation {
    pub ticket: TicketRequest,
    pub notification: Notification,
}

pub struct PaymentConfirmation {
    pub ticket: TicketRequest,
    /// Record locator from the reservation system, if one was obtained.
    pub reservation: BestEffort<String>,
    pub notifications: Vec<Notification>,
}

pub enum WebhookOutcome {
    Confirmed(PaymentConfirmation),
    /// Redelivery of a checkout that was already applied; nothing was done.
    AlreadyConfirmed(SessionId),
    Ignored { event_type: String },
}

pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    staff: Arc<dyn StaffDirectory>,
    payments: Arc<dyn PaymentGateway>,
    reservations: Option<Arc<dyn ReservationApi>>,
    notifications: Arc<NotificationService>,
    default_currency: String,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        staff: Arc<dyn StaffDirectory>,
        payments: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        TicketService {
            tickets,
            staff,
            payments,
            reservations: None,
            notifications,
            default_currency: "USD".to_string(),
        }
    }

    pub fn with_reservations(mut self, reservations: Arc<dyn ReservationApi>) -> Self {
        self.reservations = Some(reservations);
        self
    }

    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.default_currency = currency.trim().to_uppercase();
        self
    }

    // Persist a new request and tell the admin about it
    pub async fn create_ticket(&self, payload: TicketPayload) -> AppResult<TicketCreation> {
        let submission = payload.into_submission()?;
        let ticket = TicketRequest::new(submission);

        self.tickets.insert(&ticket).await?;
        tracing::info!(session_id = %ticket.session_id, "ticket request created");

        let notification = self.notifications.admin_form_submission(&ticket);
        Ok(TicketCreation { ticket, notification })
    }

    pub async fn get_ticket(&self, session_id: &str) -> AppResult<TicketRequest> {
        let session_id = SessionId::parse(session_id)?;
        self.find(&session_id).await
    }

    async fn find(&self, session_id: &SessionId) -> AppResult<TicketRequest> {
        self.tickets
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))
    }

    pub async fn list_tickets(&self, page: Option<u32>, limit: Option<u32>) -> AppResult<TicketPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let offset = u64::from(page - 1) * u64::from(limit);

        let (data, total) = self.tickets.list(offset, limit).await?;
        Ok(TicketPage {
            data,
            pagination: Pagination { page, limit, total },
        })
    }

    pub async fn get_payment_info(&self, session_id: &str) -> AppResult<PaymentInfo> {
        let ticket = self.get_ticket(session_id).await?;
        if !ticket.is_paid() {
            return Err(AppError::NotFound("Payment not processed".into()));
        }

        Ok(PaymentInfo {
            passenger_name: ticket.submission.lead_passenger_name(),
            currency: ticket.amount_paid.currency,
            amount: ticket.amount_paid.amount,
            pnr: ticket.pnr,
        })
    }

    // Open a hosted checkout priced from the stored request, never from the client
    pub async fn create_checkout(&self, request: PaymentRequest) -> AppResult<CheckoutSession> {
        let session_id = SessionId::parse(&request.session_id)?;
        let ticket = self.find(&session_id).await?;
        if ticket.is_paid() {
            return Err(AppError::Conflict("Ticket has already been paid".into()));
        }

        let total = ticket
            .submission
            .total_amount
            .filter(|amount| *amount > Decimal::ZERO)
            .ok_or_else(|| AppError::ValidationError("Ticket has no payable totalAmount".into()))?;
        let amount = (total * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::ValidationError("totalAmount is out of range".into()))?;

        let currency = match request.currency.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(currency) => currency.to_uppercase(),
            None => self.default_currency.clone(),
        };
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::ValidationError("Invalid currency".into()));
        }

        let submission = &ticket.submission;
        let checkout = CheckoutRequest {
            session_id,
            customer_email: submission.email.clone(),
            description: format!("{} ticket {} → {}", submission.trip_type, submission.from, submission.to),
            currency,
            amount,
            metadata: CheckoutMetadata {
                session_id: session_id.to_string(),
                customer: submission.lead_passenger_name(),
                ticket_type: Some(submission.trip_type.to_string()),
                departure_city: Some(submission.from.clone()),
                arrival_city: Some(submission.to.clone()),
                departure_date: Some(submission.departure_date.to_string()),
                return_date: submission.return_date.map(|d| d.to_string()),
            },
        };

        let session = self.payments.create_checkout_session(&checkout).await?;
        tracing::info!(session_id = %session_id, checkout_id = %session.id, amount, "checkout session created");
        Ok(session)
    }

    /// Verifies and applies a payment provider callback. `payload` is the untouched request body.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> AppResult<WebhookOutcome> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::WebhookError("Missing Stripe-Signature header".into()))?;

        let event = self.payments.verify_webhook(payload, signature).map_err(|err| {
            tracing::warn!(error = %err, "rejected payment webhook");
            AppError::from(err)
        })?;

        match event {
            WebhookEvent::CheckoutCompleted(checkout) => self.confirm_payment(checkout).await,
            WebhookEvent::Other { id, event_type } => {
                tracing::debug!(event_id = %id, %event_type, "ignoring payment event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }

    async fn confirm_payment(&self, checkout: CompletedCheckout) -> AppResult<WebhookOutcome> {
        let session_id = checkout.session_id;
        let amount = AmountPaid::from_minor_units(&checkout.currency, checkout.amount_total);

        let mut ticket = match self.tickets.mark_paid(&session_id, &amount).await? {
            PaymentTransition::Applied(ticket) => ticket,
            PaymentTransition::AlreadyPaid(_) => {
                tracing::info!(session_id = %session_id, checkout_id = %checkout.checkout_id, "duplicate checkout completion ignored");
                return Ok(WebhookOutcome::AlreadyConfirmed(session_id));
            }
            PaymentTransition::NotFound => {
                tracing::error!(
                    session_id = %session_id,
                    checkout_id = %checkout.checkout_id,
                    "checkout completed for an unknown session"
                );
                return Err(AppError::NotFound("Session not found".into()));
            }
        };
        tracing::info!(session_id = %session_id, currency = %amount.currency, amount = %amount.amount, "payment confirmed");

        let reservation = self.reserve(&ticket).await;
        if let BestEffort::Completed(pnr) = &reservation {
            ticket.pnr = Some(pnr.clone());
        }

        let notifications = self.notifications.payment_confirmations(&checkout);
        Ok(WebhookOutcome::Confirmed(PaymentConfirmation { ticket, reservation, notifications }))
    }

    async fn reserve(&self, ticket: &TicketRequest) -> BestEffort<String> {
        let Some(api) = &self.reservations else {
            return BestEffort::Skipped;
        };
        let session_id = ticket.session_id;

        let pnr = match api.create_reservation(ticket).await {
            Ok(Some(pnr)) => pnr,
            Ok(None) => {
                tracing::warn!(session_id = %session_id, "reservation created without a record locator");
                return BestEffort::Skipped;
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "reservation creation failed");
                return BestEffort::Failed(err.to_string());
            }
        };

        match self.tickets.attach_pnr(&session_id, &pnr).await {
            Ok(true) => {
                tracing::info!(session_id = %session_id, %pnr, "reservation recorded");
                BestEffort::Completed(pnr)
            }
            Ok(false) => {
                tracing::warn!(session_id = %session_id, %pnr, "ticket already carries a record locator");
                BestEffort::Failed("record locator already set".into())
            }
            Err(err) => {
                tracing::error!(session_id = %session_id, %pnr, error = %err, "failed to store record locator");
                BestEffort::Failed(err.to_string())
            }
        }
    }

    /// Staff-driven fulfillment transition. `handledBy` is taken from the body's `userId`;
    /// `actor` is the staff member whose token authorized the call.
    pub async fn update_fulfillment(
        &self,
        session_id: &str,
        request: StatusUpdateRequest,
        actor: &StaffId,
    ) -> AppResult<TicketRequest> {
        let staff_id = StaffId::parse(&request.user_id)?;
        let session_id = SessionId::parse(session_id)?;

        self.staff
            .find(&staff_id)
            .await?
            .filter(StaffUser::is_active)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let ticket = self
            .tickets
            .update_fulfillment(&session_id, request.order_status, &staff_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

        if staff_id != *actor {
            tracing::warn!(session_id = %session_id, staff_id = %staff_id, actor = %actor, "fulfillment attributed to another staff member");
        }
        tracing::info!(
            session_id = %session_id,
            staff_id = %staff_id,
            actor = %actor,
            order_status = %ticket.order_status,
            "fulfillment status updated"
        );
        Ok(ticket)
    }

    pub async fn delete_ticket(&self, session_id: &str) -> AppResult<()> {
        let session_id = SessionId::parse(session_id)?;
        if !self.tickets.delete(&session_id).await? {
            return Err(AppError::NotFound("Ticket not found".into()));
        }
        tracing::info!(session_id = %session_id, "ticket request deleted");
        Ok(())
    }
}
