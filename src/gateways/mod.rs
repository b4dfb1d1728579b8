pub mod flight_provider;
pub mod mailer;
pub mod payment;
pub mod reservation;
