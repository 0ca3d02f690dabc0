//! Market events and the attendance series the event chart plots.

pub mod handlers;
pub mod routes;
