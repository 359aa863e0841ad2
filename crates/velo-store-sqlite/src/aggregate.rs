//! Synchronous build queries, run inside the connection thread.
//!
//! Each build is handed the [`Snapshot`]s it reads and clears then refills
//! its target in one transaction, so a target always holds exactly one
//! build's rows.

use rusqlite::{Connection, params};
use velo_core::{
  aggregate::{AggregateReport, AggregateTable},
  snapshot::{Snapshot, StagingTable},
};

use crate::encode::encode_date;

/// `max(created_date)` of a staging table, `None` when it holds no rows.
pub fn latest_created_date(
  conn: &Connection,
  table: StagingTable,
) -> rusqlite::Result<Option<String>> {
  conn.query_row(
    &format!("SELECT MAX(created_date) FROM {}", table.table_name()),
    [],
    |r| r.get(0),
  )
}

fn count(conn: &Connection, table: AggregateTable) -> rusqlite::Result<usize> {
  let n: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {}", table.table_name()),
    [],
    |r| r.get(0),
  )?;
  Ok(n as usize)
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

pub fn build_dim_city(
  conn: &mut Connection,
  city: Snapshot,
) -> rusqlite::Result<AggregateReport> {
  let tx = conn.transaction()?;

  tx.execute("DELETE FROM dim_city", [])?;
  // Several registry entries may share a code; ordering makes the surviving
  // row deterministic (the last one for each id wins the REPLACE).
  tx.execute(
    "INSERT OR REPLACE INTO dim_city (id, name, nb_inhabitants)
     SELECT id, name, nb_inhabitants
       FROM consolidate_city
      WHERE created_date = ?1
      ORDER BY id, name, nb_inhabitants",
    params![encode_date(city.created_date)],
  )?;
  let rows_written = count(&tx, AggregateTable::DimCity)?;
  tx.commit()?;

  Ok(AggregateReport::new(AggregateTable::DimCity, rows_written, vec![city]))
}

pub fn build_dim_station(
  conn: &mut Connection,
  station: Snapshot,
) -> rusqlite::Result<AggregateReport> {
  let tx = conn.transaction()?;

  tx.execute("DELETE FROM dim_station", [])?;
  tx.execute(
    "INSERT OR REPLACE INTO dim_station
       (id, code, name, address, longitude, latitude, status, capacity)
     SELECT id, code, name, address, longitude, latitude, status, capacity
       FROM consolidate_station
      WHERE created_date = ?1",
    params![encode_date(station.created_date)],
  )?;
  let rows_written = count(&tx, AggregateTable::DimStation)?;
  tx.commit()?;

  Ok(AggregateReport::new(AggregateTable::DimStation, rows_written, vec![station]))
}

// ─── Fact ────────────────────────────────────────────────────────────────────

const FACT_INSERT: &str = "
INSERT OR REPLACE INTO fact_station_statement
  (station_id, city_id, bicycle_docks_available, bicycle_available,
   last_statement_date, created_date)
SELECT st.station_id, c.id, st.bicycle_docks_available, st.bicycle_available,
       st.last_statement_date, ?4
  FROM consolidate_station_statement st
  JOIN consolidate_station s
    ON s.id = st.station_id AND s.created_date = ?2
  LEFT JOIN consolidate_city c
    ON c.id = s.city_code AND c.created_date = ?3
 WHERE st.created_date = ?1
   AND TRIM(s.city_code) != '0'
   AND c.id IS NOT NULL
";

const UNMAPPED_COUNT: &str = "
SELECT COUNT(*)
  FROM consolidate_station_statement st
  JOIN consolidate_station s
    ON s.id = st.station_id AND s.created_date = ?2
 WHERE st.created_date = ?1
   AND TRIM(s.city_code) = '0'
";

/// Join the latest statement, station and city partitions into the fact.
///
/// Statements whose station carries the unmapped city code are excluded, as
/// are statements whose station or city is missing from its partition. Every
/// statement yields at most one fact row, so the unresolved count is whatever
/// is neither written nor unmapped.
pub fn build_fact_station_statement(
  conn: &mut Connection,
  [statement, station, city]: [Snapshot; 3],
  run_date: String,
) -> rusqlite::Result<AggregateReport> {
  let tx = conn.transaction()?;
  let statement_date = encode_date(statement.created_date);
  let station_date = encode_date(station.created_date);
  let city_date = encode_date(city.created_date);

  let considered: i64 = tx.query_row(
    "SELECT COUNT(*) FROM consolidate_station_statement WHERE created_date = ?1",
    params![statement_date],
    |r| r.get(0),
  )?;
  let unmapped: i64 = tx.query_row(
    UNMAPPED_COUNT,
    params![statement_date, station_date],
    |r| r.get(0),
  )?;

  tx.execute("DELETE FROM fact_station_statement", [])?;
  tx.execute(
    FACT_INSERT,
    params![statement_date, station_date, city_date, run_date],
  )?;
  let rows_written = count(&tx, AggregateTable::FactStationStatement)?;
  tx.commit()?;

  let unmapped = unmapped as usize;
  let mut report = AggregateReport::new(
    AggregateTable::FactStationStatement,
    rows_written,
    vec![statement, station, city],
  );
  report.excluded_unmapped = unmapped;
  report.excluded_unresolved =
    (considered as usize).saturating_sub(unmapped + rows_written);
  Ok(report)
}
