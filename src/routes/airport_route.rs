use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::models::flight::Location;
use crate::models::response::ApiResponse;
use crate::services::flight_service::FlightService;
use crate::utils::error::AppError;

/// Airport lookup by keyword
#[openapi(tag = "Flights")]
#[get("/airports?<keyword>")]
pub async fn search_airports(
    keyword: Option<String>,
    flight_service: &State<FlightService>,
) -> Result<Json<ApiResponse<Vec<Location>>>, AppError> {
    let airports = flight_service.search_airports(keyword.as_deref().unwrap_or_default()).await?;
    Ok(Json(ApiResponse::success("Airports list fetched successfully", airports)))
}
