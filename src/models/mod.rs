pub mod airline;
pub mod flight;
pub mod payment;
pub mod response;
pub mod staff;
pub mod ticket;
