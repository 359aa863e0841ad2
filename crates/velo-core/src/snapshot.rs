//! Latest-snapshot selection over the append-only staging tables.
//!
//! Staging tables keep every ingestion day. Rollups only ever read the most
//! recent day: [`MobilityStore::latest_snapshot`] resolves `max(created_date)`
//! of a table into a [`Snapshot`], and each build binds its
//! [`Snapshot::created_date`] as the `created_date == max` filter.
//!
//! [`MobilityStore::latest_snapshot`]: crate::store::MobilityStore::latest_snapshot

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Staging tables ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingTable {
  City,
  Station,
  StationStatement,
}

impl StagingTable {
  pub fn table_name(self) -> &'static str {
    match self {
      Self::City => "consolidate_city",
      Self::Station => "consolidate_station",
      Self::StationStatement => "consolidate_station_statement",
    }
  }
}

impl fmt::Display for StagingTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.table_name())
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The latest ingestion-day partition of a staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub table:        StagingTable,
  pub created_date: NaiveDate,
}

impl Snapshot {
  pub fn new(table: StagingTable, created_date: NaiveDate) -> Self {
    Self { table, created_date }
  }
}

impl fmt::Display for Snapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.table, self.created_date)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn display_names_table_and_day() {
    let snapshot = Snapshot::new(StagingTable::Station, date("2024-05-01"));
    assert_eq!(snapshot.to_string(), "consolidate_station@2024-05-01");
  }

  #[test]
  fn snapshot_serializes_table_in_snake_case() {
    let snapshot = Snapshot::new(StagingTable::StationStatement, date("2024-05-02"));
    assert_eq!(
      serde_json::to_value(snapshot).unwrap(),
      serde_json::json!({ "table": "station_statement", "created_date": "2024-05-02" })
    );
  }
}
