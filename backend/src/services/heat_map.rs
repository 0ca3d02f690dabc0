//! Traffic aggregation behind the market heat map.
//!
//! The dashboard draws the heat map itself; this module supplies the numbers:
//!
//! - [`heat_map`] averages each active vendor's traffic over a [`TimeRange`]
//!   (optionally restricted to one hour of the day) and scales the average
//!   customer count to a 0-100 intensity.
//! - [`hourly_trends`] buckets one vendor's recent records by hour of day.
//! - [`market_layout`] returns booth positions, placing vendors that have no
//!   coordinates on a square grid, together with the fixed landmarks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use market_store::{
    Location, MarketStore, Result, TrafficFilter, TrafficRecord, Vendor, VendorCategory,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Number of trailing records returned with each vendor summary.
pub const RECENT_DATA_POINTS: usize = 5;
pub const DEFAULT_TREND_HOURS: i64 = 24;

const GRID_SPACING: f64 = 100.0;
const GRID_ORIGIN: f64 = 100.0;
const MARKET_WIDTH: u32 = 800;
const MARKET_HEIGHT: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    /// The current UTC calendar day.
    Today,
    /// The last seven days.
    Week,
    /// The last thirty days.
    Month,
    #[default]
    All,
}

impl TimeRange {
    /// Unknown or missing names select every record.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("today") => Self::Today,
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::All,
        }
    }

    /// Inclusive `(from, to)` bounds relative to `now`.
    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            Self::Today => {
                let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
                let end = start + Duration::days(1) - Duration::milliseconds(1);
                (Some(start), Some(end))
            }
            Self::Week => (Some(now - Duration::days(7)), Some(now)),
            Self::Month => (Some(now - Duration::days(30)), Some(now)),
            Self::All => (None, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorTraffic {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub booth_number: String,
    pub location: Location,
    /// Intensity on a 0-100 scale.
    pub traffic: f64,
    pub avg_customers: i64,
    pub avg_dwell_time: i64,
    pub total_data_points: usize,
    pub recent_data: Vec<TrafficRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_of_day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatMapMetadata {
    pub date_range: DateRange,
    pub total_vendors: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatMapReport {
    pub success: bool,
    pub data: Vec<VendorTraffic>,
    pub metadata: HeatMapMetadata,
}

/// Summarizes `records`, which must be ordered oldest first.
#[must_use]
pub fn summarize_vendor(
    vendor: &Vendor,
    records: &[TrafficRecord],
    max_expected_customers: f64,
) -> VendorTraffic {
    let points = records.len();
    let (avg_customers, avg_dwell_time) = if points == 0 {
        (0.0, 0.0)
    } else {
        let customers: f64 = records.iter().map(|r| f64::from(r.customer_count)).sum();
        let dwell: f64 = records.iter().map(|r| r.dwell_time).sum();
        (customers / points as f64, dwell / points as f64)
    };

    let traffic = (avg_customers / max_expected_customers * 100.0).min(100.0);

    VendorTraffic {
        id: vendor.id,
        name: vendor.name.clone(),
        category: vendor.category,
        booth_number: vendor.booth_number.clone(),
        location: vendor.location.unwrap_or_default(),
        traffic,
        avg_customers: avg_customers.round() as i64,
        avg_dwell_time: avg_dwell_time.round() as i64,
        total_data_points: points,
        recent_data: records[points.saturating_sub(RECENT_DATA_POINTS)..].to_vec(),
    }
}

/// Builds the heat map for every active vendor.
///
/// Traffic for the whole window is fetched in one query and grouped by vendor.
pub async fn heat_map(
    store: &dyn MarketStore,
    range: TimeRange,
    hour_of_day: Option<u8>,
    max_expected_customers: f64,
    now: DateTime<Utc>,
) -> Result<HeatMapReport> {
    let (from, to) = range.window(now);
    let vendors = store.list_vendors(true).await?;
    let records = store
        .list_traffic(TrafficFilter {
            from,
            to,
            hour_of_day,
            ..TrafficFilter::default()
        })
        .await?;

    let mut by_vendor: HashMap<Uuid, Vec<TrafficRecord>> = HashMap::new();
    for record in records {
        by_vendor.entry(record.vendor_id).or_default().push(record);
    }
    debug!(
        vendors = vendors.len(),
        vendors_with_traffic = by_vendor.len(),
        ?range,
        "aggregating heat map"
    );

    let data = vendors
        .iter()
        .map(|vendor| {
            let records = by_vendor.get(&vendor.id).map_or(&[][..], Vec::as_slice);
            summarize_vendor(vendor, records, max_expected_customers)
        })
        .collect();

    Ok(HeatMapReport {
        success: true,
        data,
        metadata: HeatMapMetadata {
            date_range: DateRange {
                from,
                to,
                hour_of_day,
            },
            total_vendors: vendors.len(),
            timestamp: now,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTrend {
    /// UTC hour of day the bucket covers.
    #[serde(rename = "_id")]
    pub hour: u32,
    pub avg_customers: f64,
    pub avg_dwell_time: f64,
    /// Sum of estimated sales; records without an estimate count as zero.
    pub total_sales: f64,
    pub count: usize,
}

/// Look-back window for trends. Missing, malformed or non-positive values
/// fall back to a day.
#[must_use]
pub fn trend_window_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|hours| *hours > 0)
        .unwrap_or(DEFAULT_TREND_HOURS)
}

/// Groups records by the hour of their timestamp, sorted by hour.
#[must_use]
pub fn hourly_trends(records: &[TrafficRecord]) -> Vec<HourlyTrend> {
    #[derive(Default)]
    struct Bucket {
        customers: f64,
        dwell: f64,
        sales: f64,
        count: usize,
    }

    let mut buckets: BTreeMap<u32, Bucket> = BTreeMap::new();
    for record in records {
        let bucket = buckets.entry(record.timestamp.hour()).or_default();
        bucket.customers += f64::from(record.customer_count);
        bucket.dwell += record.dwell_time;
        bucket.sales += record
            .sales
            .as_ref()
            .and_then(|sales| sales.estimated)
            .unwrap_or(0.0);
        bucket.count += 1;
    }

    buckets
        .into_iter()
        .map(|(hour, bucket)| {
            let n = bucket.count as f64;
            HourlyTrend {
                hour,
                avg_customers: bucket.customers / n,
                avg_dwell_time: bucket.dwell / n,
                total_sales: bucket.sales,
                count: bucket.count,
            }
        })
        .collect()
}

/// Hourly trends for one vendor over the last `hours` hours.
pub async fn vendor_trends(
    store: &dyn MarketStore,
    vendor_id: Uuid,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<Vec<HourlyTrend>> {
    // A window reaching past the representable range has no lower bound.
    let from = Duration::try_hours(hours).and_then(|window| now.checked_sub_signed(window));
    let records = store
        .list_traffic(TrafficFilter {
            vendor_id: Some(vendor_id),
            from,
            ..TrafficFilter::default()
        })
        .await?;
    Ok(hourly_trends(&records))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutVendor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub booth_number: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub id: &'static str,
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub category: &'static str,
    pub is_landmark: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketLayout {
    pub vendors: Vec<LayoutVendor>,
    pub landmarks: Vec<Landmark>,
    pub dimensions: Dimensions,
}

fn landmarks() -> Vec<Landmark> {
    let landmark = |id, name, x, category| Landmark {
        id,
        name,
        x,
        y: 250.0,
        category,
        is_landmark: true,
    };
    vec![
        landmark("info", "Information Booth", 350.0, "info"),
        landmark("seating", "Seating Area", 250.0, "seating"),
        landmark("restroom", "Restrooms", 450.0, "facilities"),
    ]
}

/// Grid slot for the vendor at `index` among `total` vendors.
fn grid_position(index: usize, total: usize) -> Location {
    let columns = ((total as f64).sqrt().ceil() as usize).max(1);
    let (row, column) = (index / columns, index % columns);
    Location {
        x: GRID_ORIGIN + column as f64 * GRID_SPACING,
        y: GRID_ORIGIN + row as f64 * GRID_SPACING,
    }
}

#[must_use]
pub fn market_layout(vendors: &[Vendor]) -> MarketLayout {
    let total = vendors.len();
    let vendors = vendors
        .iter()
        .enumerate()
        .map(|(index, vendor)| LayoutVendor {
            id: vendor.id,
            name: vendor.name.clone(),
            category: vendor.category,
            booth_number: vendor.booth_number.clone(),
            location: match vendor.location {
                Some(location) if !location.is_origin() => location,
                _ => grid_position(index, total),
            },
        })
        .collect();

    MarketLayout {
        vendors,
        landmarks: landmarks(),
        dimensions: Dimensions {
            width: MARKET_WIDTH,
            height: MARKET_HEIGHT,
        },
    }
}
