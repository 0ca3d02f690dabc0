//! Sample data for demos and local development.
//!
//! [`seed`] wipes the store and loads a small market: a handful of accounts,
//! thirteen vendors laid out in three rows, a month of hourly traffic and
//! weekend events. Random values come from the caller's RNG so runs can be
//! reproduced.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use market_store::{
    Location, MarketDay, MarketStore, NewEvent, NewTrafficRecord, NewUser, NewVendor, Product,
    Role, Sales, Vendor, VendorCategory, Weather, WeatherCondition,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::errors::AppError;

pub const SAMPLE_PASSWORD: &str = "password123";

/// Days of history generated, not counting today.
const HISTORY_DAYS: i64 = 30;
const FIRST_MARKET_HOUR: u32 = 8;
const LAST_MARKET_HOUR: u32 = 18;

const MOCK_WEATHER: [WeatherCondition; 4] = [
    WeatherCondition::Sunny,
    WeatherCondition::Cloudy,
    WeatherCondition::Rainy,
    WeatherCondition::Windy,
];

const EVENT_NAMES: [&str; 7] = [
    "Farmers Market Opening Day",
    "Live Music Saturday",
    "Cooking Demonstration",
    "Kids Activities Day",
    "Seasonal Festival",
    "Local Artist Showcase",
    "Farm-to-Table Workshop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleUser {
    pub name: &'static str,
    pub email: &'static str,
    pub role: Role,
    pub company: &'static str,
}

pub const SAMPLE_USERS: [SampleUser; 5] = [
    SampleUser {
        name: "Admin User",
        email: "admin@example.com",
        role: Role::Admin,
        company: "Company A",
    },
    SampleUser {
        name: "Vendor A1",
        email: "vendora1@example.com",
        role: Role::Vendor,
        company: "Company A",
    },
    SampleUser {
        name: "Vendor B1",
        email: "vendorb1@example.com",
        role: Role::Vendor,
        company: "Company B",
    },
    SampleUser {
        name: "Market Manager A",
        email: "managera@example.com",
        role: Role::MarketManager,
        company: "Company A",
    },
    SampleUser {
        name: "Honey Man",
        email: "honeyman@example.com",
        role: Role::MarketManager,
        company: "Company C1",
    },
];

/// `(name, category, booth, x, y, featured product)`
const SAMPLE_VENDORS: [(&str, VendorCategory, &str, f64, f64, (&str, f64)); 13] = [
    ("Fresh Produce Co.", VendorCategory::Produce, "A1", 150.0, 120.0, ("Apples", 2.5)),
    ("Artisan Breads", VendorCategory::Bakery, "A2", 250.0, 120.0, ("Bread", 4.0)),
    ("Honey Heaven", VendorCategory::Honey, "A3", 350.0, 120.0, ("Honey", 8.0)),
    ("Flower Power", VendorCategory::Flowers, "A4", 450.0, 120.0, ("Tulips", 6.0)),
    ("Craft Corner", VendorCategory::Crafts, "A5", 550.0, 120.0, ("Candles", 12.0)),
    ("Farm Fresh Dairy", VendorCategory::Dairy, "B1", 150.0, 220.0, ("Milk", 3.5)),
    ("Organic Greens", VendorCategory::Produce, "B2", 250.0, 220.0, ("Kale", 3.0)),
    ("Hot Food Stand", VendorCategory::PreparedFood, "B3", 350.0, 220.0, ("Tacos", 9.0)),
    ("Jam & Jellies", VendorCategory::Other, "B4", 450.0, 220.0, ("Jam", 7.0)),
    ("Apple Orchard", VendorCategory::Produce, "C1", 150.0, 320.0, ("Cider", 5.0)),
    ("Sourdough Sam", VendorCategory::Bakery, "C2", 250.0, 320.0, ("Sourdough", 6.5)),
    ("Coffee Cart", VendorCategory::PreparedFood, "C3", 350.0, 320.0, ("Coffee", 3.0)),
    ("Cheese Please", VendorCategory::Dairy, "C4", 450.0, 320.0, ("Cheddar", 10.0)),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub vendors: usize,
    pub traffic_records: usize,
    pub events: usize,
}

/// Sample vendors. Booths A1 and B1 belong to the matching vendor accounts
/// when their ids are given; each booth row is run by its own company.
#[must_use]
pub fn sample_vendors(
    owner_a1: Option<Uuid>,
    owner_b1: Option<Uuid>,
) -> Vec<NewVendor> {
    SAMPLE_VENDORS
        .iter()
        .map(|&(name, category, booth, x, y, (product, price))| {
            let row = &booth[..1];
            NewVendor {
                name: name.to_string(),
                company: format!("Company {row}"),
                category,
                booth_number: booth.to_string(),
                location: Some(Location { x, y }),
                owner: match booth {
                    "A1" => owner_a1,
                    "B1" => owner_b1,
                    _ => None,
                },
                products: vec![Product {
                    name: product.to_string(),
                    category: Some(category.as_str().to_string()),
                    average_price: Some(price),
                }],
                market_days: vec![MarketDay::Saturday, MarketDay::Sunday],
                is_active: true,
            }
        })
        .collect()
}

/// Hourly traffic for every vendor over the last month of market days.
pub fn mock_traffic<R: Rng + ?Sized>(
    vendors: &[Vendor],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<NewTrafficRecord> {
    let mut records = Vec::new();

    for days_back in (0..=HISTORY_DAYS).rev() {
        let day = (now - Duration::days(days_back)).date_naive();
        let weekday = MarketDay::from(day.weekday());

        for hour in FIRST_MARKET_HOUR..=LAST_MARKET_HOUR {
            let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                continue;
            };
            let timestamp = day.and_time(time).and_utc();

            for vendor in vendors {
                let mut base = f64::from(rng.gen_range(5u32..25));
                if weekday.is_weekend() {
                    base *= 1.5;
                }
                if (10..=14).contains(&hour) {
                    base *= 1.3;
                }
                let condition = MOCK_WEATHER[rng.gen_range(0..MOCK_WEATHER.len())];
                match condition {
                    WeatherCondition::Rainy => base *= 0.6,
                    WeatherCondition::Sunny => base *= 1.2,
                    _ => {}
                }

                records.push(NewTrafficRecord {
                    vendor_id: vendor.id,
                    company: vendor.company.clone(),
                    timestamp,
                    customer_count: base.floor() as u32,
                    dwell_time: f64::from(rng.gen_range(60u32..360)),
                    weather: Some(Weather {
                        temperature: Some(f64::from(rng.gen_range(50u32..80))),
                        condition: Some(condition),
                        humidity: Some(f64::from(rng.gen_range(30u32..70))),
                    }),
                    day_of_week: Some(weekday.as_str().to_string()),
                    hour_of_day: Some(hour as u8),
                    sales: Some(Sales {
                        estimated: Some(base * rng.gen_range(5.0..20.0)),
                        actual: None,
                    }),
                });
            }
        }
    }

    records
}

/// One event on each weekend day of the last month.
pub fn mock_events<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Vec<NewEvent> {
    (0..=HISTORY_DAYS)
        .rev()
        .map(|days_back| now - Duration::days(days_back))
        .filter(|date| MarketDay::from(date.weekday()).is_weekend())
        .map(|date| NewEvent {
            name: EVENT_NAMES
                .choose(rng)
                .copied()
                .unwrap_or(EVENT_NAMES[0])
                .to_string(),
            date,
            attendees: rng.gen_range(50..250),
            description: Some("Special market event".to_string()),
            location: Some("Main Market Square".to_string()),
            market_id: None,
        })
        .collect()
}

/// Replaces everything in the store with the sample market.
pub async fn seed<R: Rng + ?Sized>(
    store: &dyn MarketStore,
    auth: &AuthService,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<SeedSummary, AppError> {
    store.clear_all().await?;

    let mut summary = SeedSummary::default();
    let mut owner_a1 = None;
    let mut owner_b1 = None;
    for sample in SAMPLE_USERS {
        let password_hash = auth
            .hash_password_blocking(SAMPLE_PASSWORD.to_string())
            .await?;
        let user = store
            .create_user(NewUser {
                name: sample.name.to_string(),
                email: sample.email.to_string(),
                password_hash,
                role: sample.role,
                company: sample.company.to_string(),
                vendor_id: None,
            })
            .await?;
        match sample.email {
            "vendora1@example.com" => owner_a1 = Some(user.id),
            "vendorb1@example.com" => owner_b1 = Some(user.id),
            _ => {}
        }
        summary.users += 1;
    }

    let mut vendors = Vec::with_capacity(SAMPLE_VENDORS.len());
    for vendor in sample_vendors(owner_a1, owner_b1) {
        vendors.push(store.create_vendor(vendor).await?);
    }
    summary.vendors = vendors.len();

    summary.traffic_records = store
        .insert_traffic_batch(mock_traffic(&vendors, now, rng))
        .await?;
    summary.events = store.insert_events(mock_events(now, rng)).await?;

    info!(
        users = summary.users,
        vendors = summary.vendors,
        traffic_records = summary.traffic_records,
        events = summary.events,
        "sample data imported"
    );
    Ok(summary)
}

/// Removes every document without loading new ones.
pub async fn destroy(store: &dyn MarketStore) -> Result<(), AppError> {
    store.clear_all().await?;
    info!("all data destroyed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use market_store::{SqliteStore, TrafficFilter};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::AuthConfig;

    fn now() -> DateTime<Utc> {
        // a Monday
        Utc.with_ymd_and_hms(2024, 6, 17, 12, 0, 0).unwrap()
    }

    fn auth() -> AuthService {
        AuthService::new(&AuthConfig {
            hash_iterations: 1_000,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn vendors_are_grouped_by_row() {
        let vendors = sample_vendors(None, None);
        assert_eq!(vendors.len(), 13);
        assert_eq!(vendors[0].company, "Company A");
        assert_eq!(vendors[5].booth_number, "B1");
        assert_eq!(vendors[5].company, "Company B");
        assert_eq!(vendors[12].company, "Company C");
        assert!(vendors.iter().all(|v| v.location.is_some() && v.is_active));
    }

    #[tokio::test]
    async fn mock_traffic_covers_market_hours() {
        let store = SqliteStore::open_in_memory().unwrap();
        let vendor = store
            .create_vendor(sample_vendors(None, None).remove(0))
            .await
            .unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let records = mock_traffic(std::slice::from_ref(&vendor), now(), &mut rng);
        assert_eq!(records.len(), 31 * 11);
        for record in &records {
            let hour = record.hour_of_day.unwrap();
            assert!((8..=18).contains(&hour));
            assert_eq!(record.company, "Company A");
            assert!(record.customer_count <= 56);
            assert!((60.0..360.0).contains(&record.dwell_time));
            assert_eq!(
                record.day_of_week.as_deref(),
                Some(MarketDay::from(record.timestamp.weekday()).as_str())
            );
        }
        assert_eq!(records.last().unwrap().day_of_week.as_deref(), Some("monday"));
    }

    #[test]
    fn mock_events_fall_on_weekends() {
        let mut rng = StdRng::seed_from_u64(7);
        let events = mock_events(now(), &mut rng);
        // 2024-05-18 .. 2024-06-17 holds five full weekends
        assert_eq!(events.len(), 10);
        for event in &events {
            assert!(MarketDay::from(event.date.weekday()).is_weekend());
            assert!((50..250).contains(&event.attendees));
            assert!(EVENT_NAMES.contains(&event.name.as_str()));
        }
    }

    #[tokio::test]
    async fn seed_replaces_existing_data() {
        let store = SqliteStore::open_in_memory().unwrap();
        let auth = auth();
        let mut rng = StdRng::seed_from_u64(42);

        let first = seed(&store, &auth, now(), &mut rng).await.unwrap();
        assert_eq!(first.users, 5);
        assert_eq!(first.vendors, 13);
        assert_eq!(first.traffic_records, 13 * 31 * 11);
        assert_eq!(first.events, 10);

        let second = seed(&store, &auth, now(), &mut rng).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.list_users().await.unwrap().len(), 5);

        let admin = store
            .find_user_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(auth.verify_password(SAMPLE_PASSWORD, &admin.password_hash));

        let vendor_a1 = store
            .find_user_by_email("vendora1@example.com")
            .await
            .unwrap()
            .unwrap();
        let vendors = store.list_vendors(true).await.unwrap();
        assert_eq!(vendors[0].owner, Some(vendor_a1.id));

        destroy(&store).await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store
            .list_traffic(TrafficFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
