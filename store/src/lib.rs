//! Core `market-store` crate for abstracting market data persistence.
//!
//! This crate defines the `MarketStore` trait, which outlines the document
//! operations the analytics backend needs (users, vendors, traffic records,
//! events and event counts), and provides the concrete SQLite implementation.

pub mod errors;
pub mod models;
pub mod schema;
pub mod sqlite;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use errors::{Result, StoreError};
pub use models::*;
pub use sqlite::SqliteStore;

/// Persistence operations used by the HTTP layer.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// from many request handlers at once.
#[async_trait]
pub trait MarketStore: Send + Sync + fmt::Debug {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Saves every field of `user` and returns it with a fresh `updated_at`.
    async fn update_user(&self, user: &User) -> Result<User>;
    /// Returns whether a user was removed.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor>;
    async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>>;
    /// Vendors in insertion order.
    async fn list_vendors(&self, active_only: bool) -> Result<Vec<Vendor>>;

    async fn insert_traffic(&self, record: NewTrafficRecord) -> Result<TrafficRecord>;
    async fn insert_traffic_batch(&self, records: Vec<NewTrafficRecord>) -> Result<usize>;
    /// Matching records ordered by timestamp, oldest first.
    async fn list_traffic(&self, filter: TrafficFilter) -> Result<Vec<TrafficRecord>>;

    async fn create_event(&self, event: NewEvent) -> Result<Event>;
    async fn insert_events(&self, events: Vec<NewEvent>) -> Result<usize>;
    /// Events newest first. The date range only applies when both bounds are set.
    async fn list_events(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>>;

    async fn create_event_data(&self, data: NewEventData) -> Result<EventData>;
    async fn list_event_data(&self, company: &str) -> Result<Vec<EventData>>;

    /// Removes every stored document.
    async fn clear_all(&self) -> Result<()>;
}
