//! The star schema: dimensions and the station-statement fact.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::station::StationStatus;

/// One row per municipality, from the latest city snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimCity {
  pub id:             String,
  pub name:           String,
  pub nb_inhabitants: Option<i64>,
}

/// One row per station, from the latest station snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimStation {
  pub id:        String,
  pub code:      String,
  pub name:      String,
  pub address:   Option<String>,
  pub longitude: Option<f64>,
  pub latitude:  Option<f64>,
  pub status:    StationStatus,
  pub capacity:  Option<i64>,
}

/// Availability of one station, resolved to its municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactStationStatement {
  pub station_id:              String,
  pub city_id:                 String,
  pub bicycle_docks_available: Option<i64>,
  pub bicycle_available:       Option<i64>,
  pub last_statement_date:     Option<String>,
  /// The aggregation run date, distinct from either staging snapshot date.
  pub created_date:            NaiveDate,
}
