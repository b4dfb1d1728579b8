use thiserror::Error;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::Request;
use rocket::Response;
use rocket::http::ContentType;
use std::io::Cursor;
use serde_json::json;
use serde::Serialize;
use rocket_okapi::JsonSchema;

use crate::gateways::flight_provider::ProviderError;
use crate::gateways::payment::PaymentError;
use crate::gateways::reservation::ReservationError;

#[derive(Error, Debug, Serialize, JsonSchema)]
pub enum AppError {
    #[error("Database error")]
    DatabaseError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Webhook error: {0}")]
    WebhookError(String),

    // Detail is logged, never rendered
    #[error("Upstream service error")]
    UpstreamError(String),
}

// Convert sqlx::Error (database error) to AppError::DatabaseError
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.errors().keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();
        AppError::ValidationError(format!("Missing or invalid fields: {}", fields.join(", ")))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature | PaymentError::MalformedEvent(_) => {
                AppError::WebhookError(err.to_string())
            }
            _ => AppError::UpstreamError(err.to_string()),
        }
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

// Define a type alias for the result type
pub type AppResult<T> = Result<T, AppError>;

/// Outcome of a side effect that must never fail the request that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    Completed(T),
    /// Not attempted (nothing configured, or nothing to do)
    Skipped,
    Failed(String),
}

impl<T> BestEffort<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            BestEffort::Completed(value) => Some(value),
            _ => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::ValidationError(_) => Status::BadRequest,
            AppError::WebhookError(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::DatabaseError(_) => Status::InternalServerError,
            AppError::UpstreamError(_) => Status::BadGateway,
            AppError::AuthError(_) => Status::Unauthorized,
            AppError::Conflict(_) => Status::Conflict,
        }
    }
}

// Format all error from route level to a Http Response at route level
#[rocket::async_trait]
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();

        match &self {
            AppError::DatabaseError(detail) | AppError::UpstreamError(detail) => {
                tracing::error!(uri = %req.uri(), %detail, "request failed: {}", self);
            }
            _ => tracing::debug!(uri = %req.uri(), "request rejected: {}", self),
        }

        let json = json!({
            "error": self.to_string()
        });

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, Cursor::new(json.to_string()))
            .ok()
    }
}
