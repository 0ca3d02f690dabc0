//! Authentication module for managing user accounts, sessions, and access control.
//!
//! This module provides the public interface for registration, login, token
//! management and the extractor that protects authenticated routes.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

// Re-exports for convenience
pub use errors::*;
pub use middleware::*;
pub use models::*;
pub use routes::*;
pub use service::*;
