//! Staged station metadata and availability statements.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// City code assigned to a station with no resolvable municipality.
pub const UNMAPPED_CITY_CODE: &str = "0";

// ─── Status ──────────────────────────────────────────────────────────────────

/// Whether a station is installed and in service. Every source encoding is
/// mapped onto this two-valued domain before staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationStatus {
  Yes,
  No,
}

impl StationStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Yes => "YES",
      Self::No => "NO",
    }
  }
}

impl fmt::Display for StationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parses the stored form only (`YES` / `NO`).
impl FromStr for StationStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "YES" => Ok(Self::Yes),
      "NO" => Ok(Self::No),
      other => Err(format!("unknown station status: {other:?}")),
    }
  }
}

// ─── StagedStation ───────────────────────────────────────────────────────────

/// One station as reported by its source on one ingestion day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedStation {
  /// `"{namespace}-{code}"`; unique across sources for a `created_date`.
  pub id:           String,
  /// The source-local code in canonical string form.
  pub code:         String,
  pub name:         String,
  pub city_name:    Option<String>,
  /// INSEE code, or [`UNMAPPED_CITY_CODE`].
  pub city_code:    String,
  pub address:      Option<String>,
  pub longitude:    Option<f64>,
  pub latitude:     Option<f64>,
  pub status:       StationStatus,
  /// Ingestion day, not an event timestamp.
  pub created_date: NaiveDate,
  pub capacity:     Option<i64>,
}

impl StagedStation {
  pub fn is_unmapped(&self) -> bool {
    self.city_code.trim() == UNMAPPED_CITY_CODE
  }
}

// ─── StagedStationStatement ──────────────────────────────────────────────────

/// Availability observed at a station, as staged on one ingestion day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedStationStatement {
  /// References a [`StagedStation::id`] built with the same namespace.
  pub station_id:              String,
  pub bicycle_docks_available: Option<i64>,
  pub bicycle_available:       Option<i64>,
  /// Source-reported observation time, ISO-8601 with an explicit offset.
  pub last_statement_date:     Option<String>,
  pub created_date:            NaiveDate,
}
