//! Heat-map endpoints. The aggregation itself lives in
//! [`crate::services::heat_map`].

pub mod handlers;
pub mod routes;
