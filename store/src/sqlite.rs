//! SQLite implementation of the [`MarketStore`] trait.
//!
//! A single `rusqlite` connection is shared behind a mutex; every trait call
//! runs on tokio's blocking pool so request handlers never block the runtime
//! on disk I/O.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::models::{
    Event, EventData, Location, NewEvent, NewEventData, NewTrafficRecord, NewUser, NewVendor,
    ProfilePicture, TrafficFilter, TrafficRecord, User, Vendor,
};
use crate::schema;
use crate::MarketStore;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, vendor_id, company, \
     picture_data, picture_content_type, enabled_graphs, created_at, updated_at";

const VENDOR_COLUMNS: &str = "id, name, company, category, booth_number, location_x, location_y, \
     owner, products, market_days, is_active, created_at, updated_at";

const TRAFFIC_COLUMNS: &str = "id, vendor_id, company, timestamp, customer_count, dwell_time, \
     weather, day_of_week, hour_of_day, sales, created_at";

const EVENT_COLUMNS: &str =
    "id, name, date, attendees, description, location, market_id, created_at, updated_at";

const EVENT_DATA_COLUMNS: &str = "id, company, date, count, location, weather";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Join("database connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Join(err.to_string()))?
    }
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn StdError + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value).map_err(|err| conversion_error(idx, err))
}

fn optional_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|value| Uuid::parse_str(&value).map_err(|err| conversion_error(idx, err)))
        .transpose()
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| conversion_error(idx, format!("timestamp {millis} out of range")))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|err| conversion_error(idx, err))
}

fn optional_json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| serde_json::from_str(&text).map_err(|err| conversion_error(idx, err)))
        .transpose()
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|err: String| conversion_error(idx, err))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_optional_json<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(to_json).transpose()
}

/// Turns a unique-constraint violation into a [`StoreError::Conflict`].
fn unique_violation(err: rusqlite::Error, message: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::conflict(message)
        }
        other => StoreError::Query(other),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let picture_data: Option<Vec<u8>> = row.get(7)?;
    let picture_type: Option<String> = row.get(8)?;

    Ok(User {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: parsed_at(row, 4)?,
        vendor_id: optional_uuid_at(row, 5)?,
        company: row.get(6)?,
        profile_picture: picture_data.map(|data| ProfilePicture {
            data,
            content_type: picture_type.unwrap_or_default(),
        }),
        enabled_graphs: json_at(row, 9)?,
        created_at: time_at(row, 10)?,
        updated_at: time_at(row, 11)?,
    })
}

fn vendor_from_row(row: &Row<'_>) -> rusqlite::Result<Vendor> {
    let x: Option<f64> = row.get(5)?;
    let y: Option<f64> = row.get(6)?;

    Ok(Vendor {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        company: row.get(2)?,
        category: parsed_at(row, 3)?,
        booth_number: row.get(4)?,
        location: match (x, y) {
            (Some(x), Some(y)) => Some(Location { x, y }),
            _ => None,
        },
        owner: optional_uuid_at(row, 7)?,
        products: json_at(row, 8)?,
        market_days: json_at(row, 9)?,
        is_active: row.get(10)?,
        created_at: time_at(row, 11)?,
        updated_at: time_at(row, 12)?,
    })
}

fn traffic_from_row(row: &Row<'_>) -> rusqlite::Result<TrafficRecord> {
    Ok(TrafficRecord {
        id: uuid_at(row, 0)?,
        vendor_id: uuid_at(row, 1)?,
        company: row.get(2)?,
        timestamp: time_at(row, 3)?,
        customer_count: row.get(4)?,
        dwell_time: row.get(5)?,
        weather: optional_json_at(row, 6)?,
        day_of_week: row.get(7)?,
        hour_of_day: row.get(8)?,
        sales: optional_json_at(row, 9)?,
        created_at: time_at(row, 10)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        date: time_at(row, 2)?,
        attendees: row.get(3)?,
        description: row.get(4)?,
        location: row.get(5)?,
        market_id: optional_uuid_at(row, 6)?,
        created_at: time_at(row, 7)?,
        updated_at: time_at(row, 8)?,
    })
}

fn event_data_from_row(row: &Row<'_>) -> rusqlite::Result<EventData> {
    Ok(EventData {
        id: uuid_at(row, 0)?,
        company: row.get(1)?,
        date: time_at(row, 2)?,
        count: row.get(3)?,
        location: row.get(4)?,
        weather: row.get(5)?,
    })
}

fn build_traffic(record: NewTrafficRecord) -> TrafficRecord {
    TrafficRecord {
        id: Uuid::new_v4(),
        vendor_id: record.vendor_id,
        company: record.company,
        timestamp: record.timestamp,
        customer_count: record.customer_count,
        dwell_time: record.dwell_time,
        weather: record.weather,
        day_of_week: record.day_of_week,
        hour_of_day: record.hour_of_day,
        sales: record.sales,
        created_at: Utc::now(),
    }
}

fn insert_traffic_row(conn: &Connection, record: &TrafficRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO traffic ({TRAFFIC_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            record.id.to_string(),
            record.vendor_id.to_string(),
            record.company,
            record.timestamp.timestamp_millis(),
            record.customer_count,
            record.dwell_time,
            to_optional_json(record.weather.as_ref())?,
            record.day_of_week,
            record.hour_of_day,
            to_optional_json(record.sales.as_ref())?,
            record.created_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn build_event(event: NewEvent) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        name: event.name,
        date: event.date,
        attendees: event.attendees,
        description: event.description,
        location: event.location,
        market_id: event.market_id,
        created_at: now,
        updated_at: now,
    }
}

fn insert_event_row(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            event.id.to_string(),
            event.name,
            event.date.timestamp_millis(),
            event.attendees,
            event.description,
            event.location,
            event.market_id.map(|id| id.to_string()),
            event.created_at.timestamp_millis(),
            event.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl MarketStore for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.call(move |conn| {
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                role: user.role,
                vendor_id: user.vendor_id,
                company: user.company,
                profile_picture: None,
                enabled_graphs: Default::default(),
                created_at: now,
                updated_at: now,
            };

            conn.execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8, ?9, ?10)"
                ),
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.vendor_id.map(|id| id.to_string()),
                    user.company,
                    to_json(&user.enabled_graphs)?,
                    user.created_at.timestamp_millis(),
                    user.updated_at.timestamp_millis(),
                ],
            )
            .map_err(|err| unique_violation(err, "User already exists"))?;

            debug!("Created user {}", user.id);
            Ok(user)
        })
        .await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id.to_string()],
                    user_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_owned();
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    [email],
                    user_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(users)
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut user = user.clone();
        self.call(move |conn| {
            user.updated_at = Utc::now();
            let (picture_data, picture_type) = match &user.profile_picture {
                Some(picture) => (Some(picture.data.clone()), Some(picture.content_type.clone())),
                None => (None, None),
            };

            let changed = conn
                .execute(
                    r"
                    UPDATE users SET
                        name = ?2, email = ?3, password_hash = ?4, role = ?5, vendor_id = ?6,
                        company = ?7, picture_data = ?8, picture_content_type = ?9,
                        enabled_graphs = ?10, updated_at = ?11
                    WHERE id = ?1
                    ",
                    params![
                        user.id.to_string(),
                        user.name,
                        user.email,
                        user.password_hash,
                        user.role.as_str(),
                        user.vendor_id.map(|id| id.to_string()),
                        user.company,
                        picture_data,
                        picture_type,
                        to_json(&user.enabled_graphs)?,
                        user.updated_at.timestamp_millis(),
                    ],
                )
                .map_err(|err| unique_violation(err, "Email is already in use"))?;

            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: "user",
                    id: user.id.to_string(),
                });
            }
            Ok(user)
        })
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.call(move |conn| {
            let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor> {
        self.call(move |conn| {
            let now = Utc::now();
            let vendor = Vendor {
                id: Uuid::new_v4(),
                name: vendor.name,
                company: vendor.company,
                category: vendor.category,
                booth_number: vendor.booth_number,
                location: vendor.location,
                owner: vendor.owner,
                products: vendor.products,
                market_days: vendor.market_days,
                is_active: vendor.is_active,
                created_at: now,
                updated_at: now,
            };

            conn.execute(
                &format!(
                    "INSERT INTO vendors ({VENDOR_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    vendor.id.to_string(),
                    vendor.name,
                    vendor.company,
                    vendor.category.as_str(),
                    vendor.booth_number,
                    vendor.location.map(|location| location.x),
                    vendor.location.map(|location| location.y),
                    vendor.owner.map(|id| id.to_string()),
                    to_json(&vendor.products)?,
                    to_json(&vendor.market_days)?,
                    vendor.is_active,
                    vendor.created_at.timestamp_millis(),
                    vendor.updated_at.timestamp_millis(),
                ],
            )?;

            debug!("Created vendor {} ({})", vendor.id, vendor.name);
            Ok(vendor)
        })
        .await
    }

    async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>> {
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?1"),
                    [id.to_string()],
                    vendor_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn list_vendors(&self, active_only: bool) -> Result<Vec<Vendor>> {
        self.call(move |conn| {
            let sql = if active_only {
                format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE is_active = 1 ORDER BY rowid")
            } else {
                format!("SELECT {VENDOR_COLUMNS} FROM vendors ORDER BY rowid")
            };
            let mut stmt = conn.prepare(&sql)?;
            let vendors = stmt
                .query_map([], vendor_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(vendors)
        })
        .await
    }

    async fn insert_traffic(&self, record: NewTrafficRecord) -> Result<TrafficRecord> {
        self.call(move |conn| {
            let record = build_traffic(record);
            insert_traffic_row(conn, &record)?;
            Ok(record)
        })
        .await
    }

    async fn insert_traffic_batch(&self, records: Vec<NewTrafficRecord>) -> Result<usize> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let count = records.len();
            for record in records {
                insert_traffic_row(&tx, &build_traffic(record))?;
            }
            tx.commit()?;
            debug!("Inserted {count} traffic records");
            Ok(count)
        })
        .await
    }

    async fn list_traffic(&self, filter: TrafficFilter) -> Result<Vec<TrafficRecord>> {
        self.call(move |conn| {
            let mut sql = format!("SELECT {TRAFFIC_COLUMNS} FROM traffic WHERE 1 = 1");
            let mut values: Vec<Value> = Vec::new();

            if let Some(vendor_id) = filter.vendor_id {
                values.push(Value::Text(vendor_id.to_string()));
                sql.push_str(&format!(" AND vendor_id = ?{}", values.len()));
            }
            if let Some(company) = filter.company {
                values.push(Value::Text(company));
                sql.push_str(&format!(" AND company = ?{}", values.len()));
            }
            if let Some(from) = filter.from {
                values.push(Value::Integer(from.timestamp_millis()));
                sql.push_str(&format!(" AND timestamp >= ?{}", values.len()));
            }
            if let Some(to) = filter.to {
                values.push(Value::Integer(to.timestamp_millis()));
                sql.push_str(&format!(" AND timestamp <= ?{}", values.len()));
            }
            if let Some(hour) = filter.hour_of_day {
                values.push(Value::Integer(i64::from(hour)));
                sql.push_str(&format!(" AND hour_of_day = ?{}", values.len()));
            }
            sql.push_str(" ORDER BY timestamp ASC, rowid ASC");

            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_from_iter(values), traffic_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        self.call(move |conn| {
            let event = build_event(event);
            insert_event_row(conn, &event)?;
            Ok(event)
        })
        .await
    }

    async fn insert_events(&self, events: Vec<NewEvent>) -> Result<usize> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let count = events.len();
            for event in events {
                insert_event_row(&tx, &build_event(event))?;
            }
            tx.commit()?;
            Ok(count)
        })
        .await
    }

    async fn list_events(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        self.call(move |conn| {
            let events = match (from, to) {
                (Some(from), Some(to)) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM events \
                         WHERE date >= ?1 AND date <= ?2 ORDER BY date DESC"
                    ))?;
                    let rows = stmt.query_map(
                        [from.timestamp_millis(), to.timestamp_millis()],
                        event_from_row,
                    )?;
                    rows.collect::<std::result::Result<Vec<_>, _>>()?
                }
                _ => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM events ORDER BY date DESC"
                    ))?;
                    let rows = stmt.query_map([], event_from_row)?;
                    rows.collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(events)
        })
        .await
    }

    async fn create_event_data(&self, data: NewEventData) -> Result<EventData> {
        self.call(move |conn| {
            let data = EventData {
                id: Uuid::new_v4(),
                company: data.company,
                date: data.date,
                count: data.count,
                location: data.location,
                weather: data.weather,
            };
            conn.execute(
                &format!("INSERT INTO event_data ({EVENT_DATA_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    data.id.to_string(),
                    data.company,
                    data.date.timestamp_millis(),
                    data.count,
                    data.location,
                    data.weather,
                ],
            )?;
            Ok(data)
        })
        .await
    }

    async fn list_event_data(&self, company: &str) -> Result<Vec<EventData>> {
        let company = company.to_owned();
        self.call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_DATA_COLUMNS} FROM event_data WHERE company = ?1 ORDER BY rowid"
            ))?;
            let rows = stmt
                .query_map([company], event_data_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn clear_all(&self) -> Result<()> {
        self.call(|conn| {
            let tx = conn.transaction()?;
            for table in ["users", "vendors", "traffic", "events", "event_data"] {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            tx.commit()?;
            info!("Cleared all market data");
            Ok(())
        })
        .await
    }
}
