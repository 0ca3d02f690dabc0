//! Data models shared by the storage layer and the HTTP backend.
//!
//! These models define the documents the market analytics service persists
//! (users, vendors, traffic records, events and event counts) together with
//! the `New*` inputs used to create them. Persisted documents serialize their
//! id as `_id` and their fields in camelCase, which is the wire format the
//! dashboard consumes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Company assigned to users and vendors created without one.
pub const DEFAULT_COMPANY: &str = "Default Company";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Vendor,
    MarketManager,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::Vendor,
        Role::MarketManager,
        Role::SuperAdmin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::MarketManager => "market_manager",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Roles that may administer other accounts.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Which dashboard charts a user is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnabledGraphs {
    pub traffic_chart: bool,
    pub weather_chart: bool,
    pub event_chart: bool,
    pub heat_map: bool,
}

impl Default for EnabledGraphs {
    fn default() -> Self {
        Self {
            traffic_chart: true,
            weather_chart: true,
            event_chart: true,
            heat_map: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A registered account. Never serialized directly: the password hash and the
/// picture bytes stay on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub vendor_id: Option<Uuid>,
    pub company: String,
    pub profile_picture: Option<ProfilePicture>,
    pub enabled_graphs: EnabledGraphs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn has_profile_picture(&self) -> bool {
        self.profile_picture
            .as_ref()
            .is_some_and(|picture| !picture.data.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub company: String,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorCategory {
    Produce,
    Dairy,
    Bakery,
    Crafts,
    PreparedFood,
    Flowers,
    Honey,
    Other,
}

impl VendorCategory {
    pub const ALL: [VendorCategory; 8] = [
        VendorCategory::Produce,
        VendorCategory::Dairy,
        VendorCategory::Bakery,
        VendorCategory::Crafts,
        VendorCategory::PreparedFood,
        VendorCategory::Flowers,
        VendorCategory::Honey,
        VendorCategory::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            VendorCategory::Produce => "produce",
            VendorCategory::Dairy => "dairy",
            VendorCategory::Bakery => "bakery",
            VendorCategory::Crafts => "crafts",
            VendorCategory::PreparedFood => "prepared_food",
            VendorCategory::Flowers => "flowers",
            VendorCategory::Honey => "honey",
            VendorCategory::Other => "other",
        }
    }
}

impl fmt::Display for VendorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VendorCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown vendor category '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl MarketDay {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MarketDay::Monday => "monday",
            MarketDay::Tuesday => "tuesday",
            MarketDay::Wednesday => "wednesday",
            MarketDay::Thursday => "thursday",
            MarketDay::Friday => "friday",
            MarketDay::Saturday => "saturday",
            MarketDay::Sunday => "sunday",
        }
    }

    #[must_use]
    pub const fn is_weekend(self) -> bool {
        matches!(self, MarketDay::Saturday | MarketDay::Sunday)
    }
}

impl From<Weekday> for MarketDay {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => MarketDay::Monday,
            Weekday::Tue => MarketDay::Tuesday,
            Weekday::Wed => MarketDay::Wednesday,
            Weekday::Thu => MarketDay::Thursday,
            Weekday::Fri => MarketDay::Friday,
            Weekday::Sat => MarketDay::Saturday,
            Weekday::Sun => MarketDay::Sunday,
        }
    }
}

/// Booth coordinates on the market floor plan.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    #[must_use]
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub category: VendorCategory,
    pub booth_number: String,
    pub location: Option<Location>,
    pub owner: Option<Uuid>,
    pub products: Vec<Product>,
    pub market_days: Vec<MarketDay>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_company() -> String {
    DEFAULT_COMPANY.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVendor {
    pub name: String,
    #[serde(default = "default_company")]
    pub company: String,
    pub category: VendorCategory,
    pub booth_number: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub market_days: Vec<MarketDay>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Windy,
    Cold,
    Hot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Weather {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<WeatherCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sales {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// One observation of customer traffic at a vendor's booth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub company: String,
    pub timestamp: DateTime<Utc>,
    pub customer_count: u32,
    /// Average seconds spent at the booth.
    pub dwell_time: f64,
    pub weather: Option<Weather>,
    pub day_of_week: Option<String>,
    pub hour_of_day: Option<u8>,
    pub sales: Option<Sales>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrafficRecord {
    pub vendor_id: Uuid,
    pub company: String,
    pub timestamp: DateTime<Utc>,
    pub customer_count: u32,
    pub dwell_time: f64,
    pub weather: Option<Weather>,
    pub day_of_week: Option<String>,
    pub hour_of_day: Option<u8>,
    pub sales: Option<Sales>,
}

/// Query parameters for traffic lookups. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficFilter {
    pub vendor_id: Option<Uuid>,
    pub company: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub hour_of_day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    pub attendees: u32,
    pub description: Option<String>,
    pub location: Option<String>,
    pub market_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub attendees: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub market_id: Option<Uuid>,
}

/// A dated attendance count reported for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub company: Option<String>,
    pub date: DateTime<Utc>,
    pub count: i64,
    pub location: Option<String>,
    pub weather: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEventData {
    pub company: Option<String>,
    pub date: DateTime<Utc>,
    pub count: i64,
    pub location: Option<String>,
    pub weather: Option<String>,
}
