//! Market vendors and their booths.

pub mod handlers;
pub mod routes;
