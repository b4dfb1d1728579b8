use schemars::JsonSchema;
use serde::Serialize;

use crate::models::ticket::{SessionId, TicketRequest};

/// `{status, message, data}` envelope used by most endpoints.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreatedResponse {
    pub status: String,
    pub message: String,
    pub session_id: SessionId,
    pub data: TicketRequest,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CheckoutResponse {
    pub message: String,
    pub url: String,
}
