#[macro_use]
extern crate rocket;
extern crate rocket_okapi;

pub mod config;
pub mod db;
pub mod gateways;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod utils;

use rocket::data::{Limits, ToByteUnit};
use rocket::{Build, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::make_swagger_ui;

use crate::services::flight_service::FlightService;
use crate::services::ticket_service::TicketService;
use crate::utils::cors::Cors;
use crate::utils::jwt::AuthKeys;
use crate::utils::swagger_doc::swagger_ui;

/// Everything the HTTP layer needs, already wired to its backends.
pub struct AppServices {
    pub ticket_service: TicketService,
    pub flight_service: FlightService,
    pub auth_keys: AuthKeys,
    pub allowed_origins: Vec<String>,
}

pub fn build_rocket(services: AppServices) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge((
        "limits",
        Limits::default()
            .limit("json", 5.mebibytes())
            .limit("bytes", 1.mebibytes()),
    ));

    rocket::custom(figment)
        .manage(services.ticket_service)
        .manage(services.flight_service)
        .manage(services.auth_keys)
        .mount(
            "/api",
            openapi_get_routes![
                routes::ticket_route::create_ticket,
                routes::ticket_route::get_ticket,
                routes::ticket_route::get_payment_info,
                routes::ticket_route::list_tickets,
                routes::ticket_route::update_status,
                routes::ticket_route::delete_ticket,
                routes::ticket_route::create_checkout,
                routes::ticket_route::payment_webhook,
                routes::flight_route::search_flights,
                routes::flight_route::add_airline,
                routes::airport_route::search_airports,
            ],
        )
        .mount("/api", routes![utils::cors::preflight])
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .register("/", catchers![routes::catchers::default_catcher])
        .attach(Cors::new(services.allowed_origins))
}
