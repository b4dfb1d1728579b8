pub mod airport_route;
pub mod catchers;
pub mod flight_route;
pub mod ticket_route;
