//! Dated attendance counts reported per company.

pub mod handlers;
pub mod routes;
