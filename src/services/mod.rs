pub mod flight_service;
pub mod notification_service;
pub mod ticket_service;
