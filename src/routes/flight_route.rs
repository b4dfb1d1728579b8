use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::models::airline::{Airline, AirlineAdmission};
use crate::models::flight::{FlightSearchQuery, FlightSearchResponse};
use crate::models::response::ApiResponse;
use crate::services::flight_service::FlightService;
use crate::utils::error::AppError;
use crate::utils::jwt::AuthenticatedStaff;

/// Search flight offers (at most one connection), with airline details attached
#[openapi(tag = "Flights")]
#[get("/flights?<query..>")]
pub async fn search_flights(
    query: FlightSearchQuery,
    flight_service: &State<FlightService>,
) -> Result<Json<FlightSearchResponse>, AppError> {
    let flights = flight_service.search_flights(query).await?;
    Ok(Json(flights))
}

/// Fetch and store metadata for one airline (staff only)
#[openapi(tag = "Staff")]
#[post("/flights/airlines/<iata_code>")]
pub async fn add_airline(
    iata_code: String,
    _staff: AuthenticatedStaff,
    flight_service: &State<FlightService>,
) -> Result<Json<ApiResponse<Airline>>, AppError> {
    match flight_service.admit_airline(&iata_code).await? {
        AirlineAdmission::Saved(airline) => Ok(Json(ApiResponse::success("Airline Info saved successfully", airline))),
        AirlineAdmission::AlreadyExists(_) => Err(AppError::Conflict("This airline data already exists".into())),
        AirlineAdmission::NotFound => Err(AppError::NotFound("No airline found".into())),
    }
}
