//! Conversions between domain types and the plain-text columns stored in
//! SQLite.
//!
//! Dates are stored as `YYYY-MM-DD` so lexicographic `MAX` is chronological.
//! Station status is stored as `YES` / `NO`.

use chrono::NaiveDate;
use velo_core::{
  city::StagedCity,
  star::{DimCity, DimStation, FactStationStatement},
  station::{StagedStation, StagedStationStatement, StationStatus},
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── StationStatus ───────────────────────────────────────────────────────────

pub fn encode_status(status: StationStatus) -> &'static str { status.as_str() }

pub fn decode_status(s: &str) -> Result<StationStatus> {
  s.parse()
    .map_err(|e: String| Error::Decode(format!("station status: {e}")))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────
//
// Rows are read inside the connection closure as plain column values and
// decoded afterwards, so decode errors surface as `Error` rather than
// `rusqlite::Error`.

pub struct RawStagedCity {
  pub id:             String,
  pub name:           String,
  pub nb_inhabitants: Option<i64>,
  pub created_date:   String,
}

impl RawStagedCity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      nb_inhabitants: row.get(2)?,
      created_date:   row.get(3)?,
    })
  }

  pub fn into_city(self) -> Result<StagedCity> {
    Ok(StagedCity {
      id:             self.id,
      name:           self.name,
      nb_inhabitants: self.nb_inhabitants,
      created_date:   decode_date(&self.created_date)?,
    })
  }
}

pub struct RawStagedStation {
  pub id:           String,
  pub code:         String,
  pub name:         String,
  pub city_name:    Option<String>,
  pub city_code:    String,
  pub address:      Option<String>,
  pub longitude:    Option<f64>,
  pub latitude:     Option<f64>,
  pub status:       String,
  pub created_date: String,
  pub capacity:     Option<i64>,
}

impl RawStagedStation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      code:         row.get(1)?,
      name:         row.get(2)?,
      city_name:    row.get(3)?,
      city_code:    row.get(4)?,
      address:      row.get(5)?,
      longitude:    row.get(6)?,
      latitude:     row.get(7)?,
      status:       row.get(8)?,
      created_date: row.get(9)?,
      capacity:     row.get(10)?,
    })
  }

  pub fn into_station(self) -> Result<StagedStation> {
    Ok(StagedStation {
      id:           self.id,
      code:         self.code,
      name:         self.name,
      city_name:    self.city_name,
      city_code:    self.city_code,
      address:      self.address,
      longitude:    self.longitude,
      latitude:     self.latitude,
      status:       decode_status(&self.status)?,
      created_date: decode_date(&self.created_date)?,
      capacity:     self.capacity,
    })
  }
}

pub struct RawStagedStatement {
  pub station_id:              String,
  pub bicycle_docks_available: Option<i64>,
  pub bicycle_available:       Option<i64>,
  pub last_statement_date:     Option<String>,
  pub created_date:            String,
}

impl RawStagedStatement {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      station_id:              row.get(0)?,
      bicycle_docks_available: row.get(1)?,
      bicycle_available:       row.get(2)?,
      last_statement_date:     row.get(3)?,
      created_date:            row.get(4)?,
    })
  }

  pub fn into_statement(self) -> Result<StagedStationStatement> {
    Ok(StagedStationStatement {
      station_id:              self.station_id,
      bicycle_docks_available: self.bicycle_docks_available,
      bicycle_available:       self.bicycle_available,
      last_statement_date:     self.last_statement_date,
      created_date:            decode_date(&self.created_date)?,
    })
  }
}

pub fn dim_city_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DimCity> {
  Ok(DimCity {
    id:             row.get(0)?,
    name:           row.get(1)?,
    nb_inhabitants: row.get(2)?,
  })
}

pub struct RawDimStation {
  pub id:        String,
  pub code:      String,
  pub name:      String,
  pub address:   Option<String>,
  pub longitude: Option<f64>,
  pub latitude:  Option<f64>,
  pub status:    String,
  pub capacity:  Option<i64>,
}

impl RawDimStation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      code:      row.get(1)?,
      name:      row.get(2)?,
      address:   row.get(3)?,
      longitude: row.get(4)?,
      latitude:  row.get(5)?,
      status:    row.get(6)?,
      capacity:  row.get(7)?,
    })
  }

  pub fn into_dim(self) -> Result<DimStation> {
    Ok(DimStation {
      id:        self.id,
      code:      self.code,
      name:      self.name,
      address:   self.address,
      longitude: self.longitude,
      latitude:  self.latitude,
      status:    decode_status(&self.status)?,
      capacity:  self.capacity,
    })
  }
}

pub struct RawFact {
  pub station_id:              String,
  pub city_id:                 String,
  pub bicycle_docks_available: Option<i64>,
  pub bicycle_available:       Option<i64>,
  pub last_statement_date:     Option<String>,
  pub created_date:            String,
}

impl RawFact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      station_id:              row.get(0)?,
      city_id:                 row.get(1)?,
      bicycle_docks_available: row.get(2)?,
      bicycle_available:       row.get(3)?,
      last_statement_date:     row.get(4)?,
      created_date:            row.get(5)?,
    })
  }

  pub fn into_fact(self) -> Result<FactStationStatement> {
    Ok(FactStationStatement {
      station_id:              self.station_id,
      city_id:                 self.city_id,
      bicycle_docks_available: self.bicycle_docks_available,
      bicycle_available:       self.bicycle_available,
      last_statement_date:     self.last_statement_date,
      created_date:            decode_date(&self.created_date)?,
    })
  }
}
