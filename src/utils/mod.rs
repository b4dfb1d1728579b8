pub mod cors;
pub mod error;
pub mod iata;
pub mod jwt;
pub mod retry;
pub mod swagger_doc;
