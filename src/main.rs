use std::sync::Arc;

use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_booking_backend::config::AppConfig;
use flight_booking_backend::db::Database;
use flight_booking_backend::gateways::flight_provider::AmadeusClient;
use flight_booking_backend::gateways::mailer::SmtpMailer;
use flight_booking_backend::gateways::payment::StripeGateway;
use flight_booking_backend::gateways::reservation::HttpReservationApi;
use flight_booking_backend::repositories::airline_repo::MySqlAirlineRepository;
use flight_booking_backend::repositories::staff_repo::MySqlStaffDirectory;
use flight_booking_backend::repositories::ticket_repo::MySqlTicketRepository;
use flight_booking_backend::services::flight_service::FlightService;
use flight_booking_backend::services::notification_service::NotificationService;
use flight_booking_backend::services::ticket_service::TicketService;
use flight_booking_backend::utils::jwt::AuthKeys;
use flight_booking_backend::{build_rocket, AppServices};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_booking_backend=debug,rocket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Connect to the database
    let database = Database::new(&config.database_url, config.db_max_connections).await?;
    database.migrate().await?;
    let pool = database.get_pool().clone();

    let mailer = SmtpMailer::new(
        &config.smtp.host,
        config.smtp.port,
        config.smtp.username.clone(),
        config.smtp.password.clone(),
        &config.smtp.sender,
    )?;
    let notifications = Arc::new(NotificationService::new(Arc::new(mailer), config.admin_email.clone()));

    let payments = StripeGateway::new(
        &config.stripe.api_base,
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        config.stripe.success_url.clone(),
        config.stripe.cancel_url.clone(),
    );

    let mut ticket_service = TicketService::new(
        Arc::new(MySqlTicketRepository::new(pool.clone())),
        Arc::new(MySqlStaffDirectory::new(pool.clone())),
        Arc::new(payments),
        notifications,
    )
    .with_default_currency(&config.default_currency);

    match &config.reservation {
        Some(reservation) => {
            let api = HttpReservationApi::new(&reservation.base_url, reservation.api_key.clone());
            ticket_service = ticket_service.with_reservations(Arc::new(api));
        }
        None => tracing::warn!("RESERVATION_API_URL not set, paid tickets will not be reserved downstream"),
    }

    let provider = AmadeusClient::new(
        &config.amadeus.base_url,
        config.amadeus.client_id.clone(),
        config.amadeus.client_secret.clone(),
    );
    let flight_service = FlightService::new(Arc::new(provider), Arc::new(MySqlAirlineRepository::new(pool)));

    tracing::info!(origins = ?config.allowed_origins, "starting flight booking backend");

    let services = AppServices {
        ticket_service,
        flight_service,
        auth_keys: AuthKeys::new(&config.jwt_secret),
        allowed_origins: config.allowed_origins.clone(),
    };

    build_rocket(services).launch().await?;
    Ok(())
}
