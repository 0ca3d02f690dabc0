//! SQLite schema and migrations for the market store.
//!
//! Timestamps are stored as UTC milliseconds since the epoch so that range
//! filters and ordering are plain integer comparisons. Nested documents
//! (products, weather, sales, graph flags) are stored as JSON text.

use rusqlite::Connection;

use crate::errors::{Result, StoreError};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

const VERSION_KEY: &str = "schema_version";

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        vendor_id TEXT,
        company TEXT NOT NULL,
        picture_data BLOB,
        picture_content_type TEXT,
        enabled_graphs TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS vendors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        company TEXT NOT NULL,
        category TEXT NOT NULL,
        booth_number TEXT NOT NULL,
        location_x REAL,
        location_y REAL,
        owner TEXT,
        products TEXT NOT NULL,
        market_days TEXT NOT NULL,
        is_active INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS traffic (
        id TEXT PRIMARY KEY,
        vendor_id TEXT NOT NULL,
        company TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        customer_count INTEGER NOT NULL,
        dwell_time REAL NOT NULL,
        weather TEXT,
        day_of_week TEXT,
        hour_of_day INTEGER,
        sales TEXT,
        created_at INTEGER NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_traffic_vendor_time ON traffic (vendor_id, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_traffic_company_time ON traffic (company, timestamp DESC)",
    "CREATE INDEX IF NOT EXISTS idx_traffic_time ON traffic (timestamp DESC)",
    r"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        date INTEGER NOT NULL,
        attendees INTEGER NOT NULL,
        description TEXT,
        location TEXT,
        market_id TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_events_date ON events (date DESC)",
    r"
    CREATE TABLE IF NOT EXISTS event_data (
        id TEXT PRIMARY KEY,
        company TEXT,
        date INTEGER NOT NULL,
        count INTEGER NOT NULL,
        location TEXT,
        weather TEXT
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_event_data_company ON event_data (company)",
];

/// Create all tables and indexes if they don't exist, then bring the schema
/// up to [`CURRENT_VERSION`].
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(StoreError::Migration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    let mut current = version;
    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    Ok(())
}

/// Returns 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| StoreError::Migration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        // Version 1 is the base schema created above.
        1 => set_schema_version(conn, 1),
        _ => Err(StoreError::Migration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn initialize_creates_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["metadata", "users", "vendors", "traffic", "events", "event_data"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration { .. }));
    }
}
