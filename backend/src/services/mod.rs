//! Module for core business logic services.
//!
//! This module encapsulates services that do more than pass a request through
//! to the store: heat-map aggregation and sample-data seeding.

pub mod heat_map;
pub mod seeder;
