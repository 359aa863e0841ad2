//! SQL schema for the velo SQLite store.
//!
//! The staging and star tables are created by separate entry points, so each
//! half of the pipeline can assume only its own tables exist.

/// Connection settings applied on open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Staging DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Staging rows are keyed by business key plus `created_date`: a new day
/// appends, a same-day rerun replaces.
pub const CONSOLIDATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS consolidate_station (
    id           TEXT NOT NULL,     -- '{namespace}-{code}'
    code         TEXT NOT NULL,
    name         TEXT NOT NULL,
    city_name    TEXT,
    city_code    TEXT NOT NULL,     -- INSEE code, '0' when unmapped
    address      TEXT,
    longitude    REAL,
    latitude     REAL,
    status       TEXT NOT NULL CHECK (status IN ('YES', 'NO')),
    created_date TEXT NOT NULL,     -- YYYY-MM-DD ingestion day
    capacity     INTEGER,
    PRIMARY KEY (id, created_date)
);

-- Unique by the full identity triple, so a registry listing one code twice
-- with different populations keeps both rows. A rerun first deletes the
-- day's rows for every id it stages.
CREATE TABLE IF NOT EXISTS consolidate_city (
    id             TEXT NOT NULL,
    name           TEXT NOT NULL,
    nb_inhabitants INTEGER,
    created_date   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS consolidate_city_identity_idx
    ON consolidate_city (id, name, IFNULL(nb_inhabitants, -1), created_date);

CREATE TABLE IF NOT EXISTS consolidate_station_statement (
    station_id              TEXT NOT NULL,
    bicycle_docks_available INTEGER,
    bicycle_available       INTEGER,
    last_statement_date     TEXT,   -- source-reported, ISO 8601 with offset
    created_date            TEXT NOT NULL,
    PRIMARY KEY (station_id, created_date)
);

CREATE INDEX IF NOT EXISTS consolidate_station_created_idx
    ON consolidate_station (created_date);
CREATE INDEX IF NOT EXISTS consolidate_city_created_idx
    ON consolidate_city (created_date);
CREATE INDEX IF NOT EXISTS consolidate_station_statement_created_idx
    ON consolidate_station_statement (created_date);
";

/// Star-schema DDL. Every aggregation run fully replaces these tables.
pub const AGGREGATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dim_city (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    nb_inhabitants INTEGER
);

CREATE TABLE IF NOT EXISTS dim_station (
    id        TEXT PRIMARY KEY,
    code      TEXT NOT NULL,
    name      TEXT NOT NULL,
    address   TEXT,
    longitude REAL,
    latitude  REAL,
    status    TEXT NOT NULL CHECK (status IN ('YES', 'NO')),
    capacity  INTEGER
);

CREATE TABLE IF NOT EXISTS fact_station_statement (
    station_id              TEXT NOT NULL,
    city_id                 TEXT NOT NULL,
    bicycle_docks_available INTEGER,
    bicycle_available       INTEGER,
    last_statement_date     TEXT,
    created_date            TEXT NOT NULL,   -- aggregation run date
    PRIMARY KEY (station_id, city_id)
);
";
