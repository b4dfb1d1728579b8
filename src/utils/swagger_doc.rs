use crate::utils::error::AppError;
use okapi::openapi3::SchemaObject;
use rocket::http::Status;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RefOr;
use rocket_okapi::okapi::openapi3::{MediaType, Response, Responses};
use rocket_okapi::okapi::Map;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::swagger_ui::SwaggerUIConfig;
use serde_json::json;

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();

        // Define error responses
        let error_responses = [
            (Status::BadRequest, "Bad Request", AppError::ValidationError("Missing or invalid fields: from".to_string())),
            (Status::Unauthorized, "Unauthorized", AppError::AuthError("Unauthorized".to_string())),
            (Status::NotFound, "Not Found", AppError::NotFound("Ticket not found".to_string())),
            (Status::Conflict, "Conflict", AppError::Conflict("Ticket has already been paid".to_string())),
            (Status::InternalServerError, "Internal Server Error", AppError::DatabaseError(String::new())),
            (Status::BadGateway, "Bad Gateway", AppError::UpstreamError(String::new())),
        ];

        for (status, description, error) in error_responses {
            let mut content = Map::new();
            content.insert(
                "application/json".to_string(),
                MediaType {
                    schema: Some(SchemaObject::default()),
                    example: Some(json!({ "error": error.to_string() })),
                    ..Default::default()
                },
            );

            responses.responses.insert(
                status.code.to_string(),
                RefOr::Object(Response {
                    description: description.to_string(),
                    content,
                    ..Default::default()
                }),
            );
        }

        Ok(responses)
    }
}

pub fn swagger_ui() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/openapi.json".to_string(),
        ..Default::default()
    }
}
