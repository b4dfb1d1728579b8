use async_trait::async_trait;
use std::sync::Arc;
use test_context::{test_context, AsyncTestContext};
use tokio::task::JoinSet;

use flight_booking_backend::{
    models::ticket::{FulfillmentState, PaymentRequest, PaymentState, SessionId, StatusUpdateRequest},
    services::{
        notification_service::{EmailTemplate, NotificationService},
        ticket_service::{TicketService, WebhookOutcome, MAX_PAGE_LIMIT},
    },
    utils::error::{AppError, BestEffort},
};
use rust_decimal::Decimal;

mod common {
    pub mod test_utils;
}
use common::test_utils::{
    checkout_completed_event, ticket_payload, CountingReservationApi, FakeStaffDirectory, InMemoryTicketRepo,
    MockPaymentGateway, RecordingMailer, VALID_SIGNATURE,
};

const ADMIN_EMAIL: &str = "desk@example.com";

struct TicketServiceContext {
    tickets: Arc<InMemoryTicketRepo>,
    staff: Arc<FakeStaffDirectory>,
    payments: Arc<MockPaymentGateway>,
    reservations: Arc<CountingReservationApi>,
    mailer: Arc<RecordingMailer>,
    ticket_service: Arc<TicketService>,
}

impl TicketServiceContext {
    /// Same backends, but with a different reservation system wired in.
    fn service_with_reservations(&self, reservations: Arc<CountingReservationApi>) -> TicketService {
        TicketService::new(
            self.tickets.clone(),
            self.staff.clone(),
            self.payments.clone(),
            Arc::new(NotificationService::new(self.mailer.clone(), ADMIN_EMAIL.to_string())),
        )
        .with_reservations(reservations)
    }

    async fn create_ticket(&self) -> Result<SessionId, AppError> {
        let creation = self.ticket_service.create_ticket(ticket_payload()).await?;
        creation.notification.outcome().await;
        Ok(creation.ticket.session_id)
    }
}

#[async_trait]
impl AsyncTestContext for TicketServiceContext {
    async fn setup() -> Self {
        let tickets = InMemoryTicketRepo::new();
        let staff = FakeStaffDirectory::new();
        let payments = MockPaymentGateway::new();
        let reservations = CountingReservationApi::issuing("ABC123");
        let mailer = RecordingMailer::new();

        let notifications = Arc::new(NotificationService::new(mailer.clone(), ADMIN_EMAIL.to_string()));
        let ticket_service = TicketService::new(tickets.clone(), staff.clone(), payments.clone(), notifications)
            .with_reservations(reservations.clone());

        TicketServiceContext {
            tickets,
            staff,
            payments,
            reservations,
            mailer,
            ticket_service: Arc::new(ticket_service),
        }
    }

    async fn teardown(self) {}
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_create_ticket_notifies_admin(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let first = ctx.ticket_service.create_ticket(ticket_payload()).await?;
    let second = ctx.ticket_service.create_ticket(ticket_payload()).await?;
    assert_ne!(first.ticket.session_id, second.ticket.session_id);
    assert_eq!(first.notification.template(), EmailTemplate::AdminFormSubmission);

    assert_eq!(first.notification.outcome().await, BestEffort::Completed(()));
    assert_eq!(second.notification.outcome().await, BestEffort::Completed(()));

    let stored = ctx.ticket_service.get_ticket(&first.ticket.session_id.to_string()).await?;
    assert_eq!(stored.payment_status, PaymentState::Unpaid);
    assert_eq!(stored.order_status, FulfillmentState::Pending);
    assert_eq!(stored.pnr, None);

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|email| email.to == ADMIN_EMAIL));
    assert!(sent[0].html_body.contains("Ada Lovelace"));

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_create_ticket_survives_mail_failure(ctx: &TicketServiceContext) -> Result<(), AppError> {
    ctx.mailer.fail_all();

    let creation = ctx.ticket_service.create_ticket(ticket_payload()).await?;
    assert!(matches!(creation.notification.outcome().await, BestEffort::Failed(_)));
    assert_eq!(ctx.tickets.len(), 1);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_invalid_ticket_is_not_stored(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let mut payload = ticket_payload();
    payload.email = "not-an-email".to_string();

    let result = ctx.ticket_service.create_ticket(payload).await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(ctx.tickets.writes(), 0);
    assert!(ctx.mailer.sent().is_empty());

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_blank_or_oversized_ticket_is_not_stored(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let mut blank_route = ticket_payload();
    blank_route.from = "   ".to_string();

    let mut blank_name = ticket_payload();
    blank_name.passengers[0].first_name = "  ".to_string();

    let mut oversized = ticket_payload();
    oversized.quantity.adults = u32::MAX;
    oversized.quantity.children = 1;

    for payload in [blank_route, blank_name, oversized] {
        let result = ctx.ticket_service.create_ticket(payload).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
    assert_eq!(ctx.tickets.writes(), 0);
    assert!(ctx.mailer.sent().is_empty());

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_unknown_and_malformed_sessions_are_not_found(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let unknown = SessionId::generate().to_string();
    assert!(matches!(ctx.ticket_service.get_ticket(&unknown).await, Err(AppError::NotFound(_))));
    assert!(matches!(ctx.ticket_service.get_ticket("64b7f0c2").await, Err(AppError::NotFound(_))));

    assert!(matches!(ctx.ticket_service.delete_ticket(&unknown).await, Err(AppError::NotFound(_))));
    assert_eq!(ctx.tickets.len(), 0);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_delete_ticket(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let kept = ctx.create_ticket().await?;
    let deleted = ctx.create_ticket().await?;

    ctx.ticket_service.delete_ticket(&deleted.to_string()).await?;

    assert!(matches!(
        ctx.ticket_service.get_ticket(&deleted.to_string()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(ctx.ticket_service.get_ticket(&kept.to_string()).await.is_ok());

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_checkout_is_priced_from_stored_ticket(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;

    let session = ctx
        .ticket_service
        .create_checkout(PaymentRequest { session_id: session_id.to_string(), currency: Some("eur".into()) })
        .await?;
    assert!(session.url.contains(&session_id.to_string()));

    let checkouts = ctx.payments.checkouts();
    assert_eq!(checkouts.len(), 1);
    let checkout = &checkouts[0];
    // totalAmount 45.99 in minor units
    assert_eq!(checkout.amount, 4599);
    assert_eq!(checkout.currency, "EUR");
    assert_eq!(checkout.customer_email, "ada@example.com");
    assert_eq!(checkout.metadata.session_id, session_id.to_string());
    assert_eq!(checkout.metadata.customer, "Ada Lovelace");
    assert_eq!(checkout.metadata.return_date.as_deref(), Some("2025-06-10"));

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_checkout_rejects_unpriced_and_paid_tickets(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let mut payload = ticket_payload();
    payload.total_amount = None;
    let unpriced = ctx.ticket_service.create_ticket(payload).await?.ticket.session_id;

    let result = ctx
        .ticket_service
        .create_checkout(PaymentRequest { session_id: unpriced.to_string(), currency: None })
        .await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));

    let paid = ctx.create_ticket().await?;
    ctx.ticket_service
        .handle_webhook(&checkout_completed_event(&paid, 4599), Some(VALID_SIGNATURE))
        .await?;

    let result = ctx
        .ticket_service
        .create_checkout(PaymentRequest { session_id: paid.to_string(), currency: None })
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(ctx.payments.checkouts().is_empty());

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_webhook_confirms_payment_once(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;
    let event = checkout_completed_event(&session_id, 4599);

    let confirmation = match ctx.ticket_service.handle_webhook(&event, Some(VALID_SIGNATURE)).await? {
        WebhookOutcome::Confirmed(confirmation) => confirmation,
        _ => panic!("first delivery should confirm the payment"),
    };
    assert_eq!(confirmation.reservation, BestEffort::Completed("ABC123".to_string()));
    assert_eq!(confirmation.notifications.len(), 2);
    for notification in confirmation.notifications {
        assert_eq!(notification.outcome().await, BestEffort::Completed(()));
    }

    let after_first = ctx.tickets.get(&session_id).expect("ticket still stored");

    let redelivery = ctx.ticket_service.handle_webhook(&event, Some(VALID_SIGNATURE)).await?;
    assert!(matches!(redelivery, WebhookOutcome::AlreadyConfirmed(id) if id == session_id));

    let after_second = ctx.tickets.get(&session_id).expect("ticket still stored");
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.payment_status, PaymentState::Paid);
    assert_eq!(after_second.amount_paid.currency, "USD");
    assert_eq!(after_second.amount_paid.amount, Decimal::new(4599, 2));
    assert_eq!(after_second.pnr.as_deref(), Some("ABC123"));
    assert_eq!(ctx.reservations.calls(), 1);

    // Admin form email, then customer confirmation and admin notice
    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().any(|email| email.to == "ada@example.com"));

    let info = ctx.ticket_service.get_payment_info(&session_id.to_string()).await?;
    assert_eq!(info.passenger_name, "Ada Lovelace");
    assert_eq!(info.pnr.as_deref(), Some("ABC123"));

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_concurrent_webhook_deliveries(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;
    let event = checkout_completed_event(&session_id, 4599);

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let service = ctx.ticket_service.clone();
        let event = event.clone();
        set.spawn(async move { service.handle_webhook(&event, Some(VALID_SIGNATURE)).await });
    }

    let mut confirmed = 0;
    let mut duplicates = 0;
    while let Some(result) = set.join_next().await {
        match result.expect("webhook task panicked")? {
            WebhookOutcome::Confirmed(_) => confirmed += 1,
            WebhookOutcome::AlreadyConfirmed(_) => duplicates += 1,
            WebhookOutcome::Ignored { .. } => panic!("completion event must not be ignored"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(ctx.reservations.calls(), 1);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_webhook_rejects_bad_signatures(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;
    let writes = ctx.tickets.writes();
    let event = checkout_completed_event(&session_id, 4599);

    let forged = ctx.ticket_service.handle_webhook(&event, Some("t=1,v1=forged")).await;
    assert!(matches!(forged, Err(AppError::WebhookError(_))));

    let unsigned = ctx.ticket_service.handle_webhook(&event, None).await;
    assert!(matches!(unsigned, Err(AppError::WebhookError(_))));

    assert_eq!(ctx.tickets.writes(), writes);
    assert_eq!(ctx.reservations.calls(), 0);
    let ticket = ctx.tickets.get(&session_id).expect("ticket still stored");
    assert_eq!(ticket.payment_status, PaymentState::Unpaid);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_webhook_for_unknown_session(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let event = checkout_completed_event(&SessionId::generate(), 1000);

    let result = ctx.ticket_service.handle_webhook(&event, Some(VALID_SIGNATURE)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(ctx.reservations.calls(), 0);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_other_events_are_ignored(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let event = br#"{"id":"evt_1","type":"payment_intent.created","data":{"object":{}}}"#;

    let outcome = ctx.ticket_service.handle_webhook(event, Some(VALID_SIGNATURE)).await?;
    assert!(matches!(outcome, WebhookOutcome::Ignored { event_type } if event_type == "payment_intent.created"));
    assert_eq!(ctx.tickets.writes(), 0);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_reservation_failure_keeps_payment(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let failing = CountingReservationApi::failing();
    let service = ctx.service_with_reservations(failing.clone());

    let session_id = ctx.create_ticket().await?;
    let event = checkout_completed_event(&session_id, 4599);

    match service.handle_webhook(&event, Some(VALID_SIGNATURE)).await? {
        WebhookOutcome::Confirmed(confirmation) => {
            assert!(matches!(confirmation.reservation, BestEffort::Failed(_)));
            assert_eq!(confirmation.ticket.pnr, None);
        }
        _ => panic!("payment should still be confirmed"),
    }

    let ticket = ctx.tickets.get(&session_id).expect("ticket still stored");
    assert_eq!(ticket.payment_status, PaymentState::Paid);
    assert_eq!(ticket.pnr, None);
    assert_eq!(failing.calls(), 1);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_unpaid_ticket_has_no_payment_info(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;

    let result = ctx.ticket_service.get_payment_info(&session_id.to_string()).await;
    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "Payment not processed"));

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_update_fulfillment(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;
    let agent = ctx.staff.add("ACTIVE");

    let ticket = ctx
        .ticket_service
        .update_fulfillment(
            &session_id.to_string(),
            StatusUpdateRequest { user_id: agent.to_string(), order_status: FulfillmentState::Contacted },
            &agent,
        )
        .await?;

    assert_eq!(ticket.order_status, FulfillmentState::Contacted);
    assert_eq!(ticket.handled_by, Some(agent));
    // Fulfillment never touches the payment axis
    assert_eq!(ticket.payment_status, PaymentState::Unpaid);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_update_fulfillment_on_behalf_of_colleague(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?;
    let agent = ctx.staff.add("ACTIVE");
    let supervisor = ctx.staff.add("ACTIVE");

    // The body names who handled the ticket; the token only names who made the call
    let ticket = ctx
        .ticket_service
        .update_fulfillment(
            &session_id.to_string(),
            StatusUpdateRequest { user_id: agent.to_string(), order_status: FulfillmentState::Delivered },
            &supervisor,
        )
        .await?;

    assert_eq!(ticket.order_status, FulfillmentState::Delivered);
    assert_eq!(ticket.handled_by, Some(agent));

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_update_fulfillment_rejections(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let session_id = ctx.create_ticket().await?.to_string();
    let supervisor = ctx.staff.add("ACTIVE");
    let writes = ctx.tickets.writes();

    let malformed = ctx
        .ticket_service
        .update_fulfillment(
            &session_id,
            StatusUpdateRequest { user_id: "64b7f0c2e1".into(), order_status: FulfillmentState::Delivered },
            &supervisor,
        )
        .await;
    assert!(matches!(malformed, Err(AppError::ValidationError(_))));
    assert_eq!(ctx.staff.lookups(), 0);

    let inactive = ctx.staff.add("SUSPENDED");
    let result = ctx
        .ticket_service
        .update_fulfillment(
            &session_id,
            StatusUpdateRequest { user_id: inactive.to_string(), order_status: FulfillmentState::Delivered },
            &supervisor,
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));

    let agent = ctx.staff.add("ACTIVE");
    let result = ctx
        .ticket_service
        .update_fulfillment(
            &SessionId::generate().to_string(),
            StatusUpdateRequest { user_id: agent.to_string(), order_status: FulfillmentState::Delivered },
            &supervisor,
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "Ticket not found"));

    // Only the last call reached the store, and it matched nothing
    assert_eq!(ctx.tickets.writes(), writes + 1);
    let ticket = ctx.tickets.get(&session_id.parse().expect("valid session id")).expect("ticket still stored");
    assert_eq!(ticket.order_status, FulfillmentState::Pending);
    assert_eq!(ticket.handled_by, None);

    Ok(())
}

#[test_context(TicketServiceContext)]
#[tokio::test]
async fn test_list_tickets_pagination(ctx: &TicketServiceContext) -> Result<(), AppError> {
    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(ctx.create_ticket().await?);
    }

    let page = ctx.ticket_service.list_tickets(Some(2), Some(2)).await?;
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.page, 2);
    let ids: Vec<SessionId> = page.data.iter().map(|t| t.session_id).collect();
    // Newest first
    assert_eq!(ids, vec![created[2], created[1]]);

    let clamped = ctx.ticket_service.list_tickets(Some(0), Some(10_000)).await?;
    assert_eq!(clamped.pagination.page, 1);
    assert_eq!(clamped.pagination.limit, MAX_PAGE_LIMIT);
    assert_eq!(clamped.data.len(), 5);

    Ok(())
}
