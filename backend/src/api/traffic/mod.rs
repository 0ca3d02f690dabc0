//! Vendor traffic records, scoped to the caller's company.

pub mod handlers;
pub mod routes;
