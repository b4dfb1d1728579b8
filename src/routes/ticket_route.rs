use rocket::request::{FromRequest, Outcome};
use rocket::serde::json::{json, Json, Value};
use rocket::{Request, State};
use rocket_okapi::openapi;
use std::convert::Infallible;

use crate::models::response::{ApiResponse, CheckoutResponse, TicketCreatedResponse};
use crate::models::ticket::{PaymentInfo, PaymentRequest, StatusUpdateRequest, TicketPage, TicketPayload, TicketRequest};
use crate::services::ticket_service::{TicketService, WebhookOutcome};
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedStaff;

/// Submit a new ticket request
#[openapi(tag = "Tickets")]
#[post("/ticket", format = "json", data = "<request>")]
pub async fn create_ticket(
    request: Json<TicketPayload>,
    ticket_service: &State<TicketService>,
) -> Result<Json<TicketCreatedResponse>, AppError> {
    // The admin notification keeps running after the response is sent
    let creation = ticket_service.create_ticket(request.into_inner()).await?;

    Ok(Json(TicketCreatedResponse {
        status: "success".to_string(),
        message: "Data received".to_string(),
        session_id: creation.ticket.session_id,
        data: creation.ticket,
    }))
}

/// Fetch a ticket request by its session id
#[openapi(tag = "Tickets")]
#[get("/ticket/<session_id>")]
pub async fn get_ticket(
    session_id: String,
    ticket_service: &State<TicketService>,
) -> Result<Json<ApiResponse<TicketRequest>>, AppError> {
    let ticket = ticket_service.get_ticket(&session_id).await?;
    Ok(Json(ApiResponse::success("Ticket details fetched successfully", ticket)))
}

/// Payment summary for the payment-successful page
#[openapi(tag = "Tickets")]
#[get("/ticket/<session_id>/payment")]
pub async fn get_payment_info(
    session_id: String,
    ticket_service: &State<TicketService>,
) -> Result<Json<ApiResponse<PaymentInfo>>, AppError> {
    let info = ticket_service.get_payment_info(&session_id).await?;
    Ok(Json(ApiResponse::success("Payment has been processed", info)))
}

/// List ticket requests, newest first (staff only)
#[openapi(tag = "Staff")]
#[get("/ticket?<page>&<limit>")]
pub async fn list_tickets(
    page: Option<u32>,
    limit: Option<u32>,
    _staff: AuthenticatedStaff,
    ticket_service: &State<TicketService>,
) -> Result<Json<TicketPage>, AppError> {
    let tickets = ticket_service.list_tickets(page, limit).await?;
    Ok(Json(tickets))
}

/// Set the fulfillment status of a ticket (staff only)
#[openapi(tag = "Staff")]
#[put("/ticket/<session_id>/status", format = "json", data = "<request>")]
pub async fn update_status(
    session_id: String,
    request: Json<StatusUpdateRequest>,
    staff: AuthenticatedStaff,
    ticket_service: &State<TicketService>,
) -> Result<Json<ApiResponse<TicketRequest>>, AppError> {
    let ticket = ticket_service
        .update_fulfillment(&session_id, request.into_inner(), &staff.staff_id)
        .await?;
    let message = format!("Order status set to {}", ticket.order_status);
    Ok(Json(ApiResponse::success(message, ticket)))
}

/// Delete a ticket request (staff only)
#[openapi(tag = "Staff")]
#[delete("/ticket/<session_id>")]
pub async fn delete_ticket(
    session_id: String,
    _staff: AuthenticatedStaff,
    ticket_service: &State<TicketService>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    ticket_service.delete_ticket(&session_id).await?;
    Ok(Json(ApiResponse::message("Data deleted successfully")))
}

/// Start a hosted checkout for a stored ticket request
#[openapi(tag = "Payments")]
#[post("/ticket/pay", format = "json", data = "<request>")]
pub async fn create_checkout(
    request: Json<PaymentRequest>,
    ticket_service: &State<TicketService>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = ticket_service.create_checkout(request.into_inner()).await?;
    Ok(Json(CheckoutResponse {
        message: "Checkout session created".to_string(),
        url: session.url,
    }))
}

/// Raw `Stripe-Signature` header, if any.
pub struct StripeSignature(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StripeSignature {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(StripeSignature(
            request.headers().get_one("Stripe-Signature").map(String::from),
        ))
    }
}

// Body is taken as raw bytes: the signature covers them exactly
#[openapi(skip)]
#[post("/ticket/webhook", data = "<payload>")]
pub async fn payment_webhook(
    payload: Vec<u8>,
    signature: StripeSignature,
    ticket_service: &State<TicketService>,
) -> Result<Json<Value>, AppError> {
    match ticket_service.handle_webhook(&payload, signature.0.as_deref()).await? {
        WebhookOutcome::Confirmed(confirmation) => {
            if let Some(pnr) = confirmation.reservation.completed() {
                tracing::debug!(session_id = %confirmation.ticket.session_id, %pnr, "webhook produced a reservation");
            }
        }
        WebhookOutcome::AlreadyConfirmed(_) | WebhookOutcome::Ignored { .. } => {}
    }
    Ok(Json(json!({ "received": true })))
}
