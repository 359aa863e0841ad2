//! Vélib' Métropole (Paris) realtime availability.
//!
//! One top-level array; each record carries both station metadata and its
//! current availability, with the municipality reported per station.

use serde::Deserialize;
use serde_json::Value;
use velo_core::{
  Result,
  source::{Dataset, Source},
  station::{StagedStation, StagedStationStatement, StationStatus, UNMAPPED_CITY_CODE},
};

use crate::{
  NormalizeContext, Normalized, SourceAdapter, SourcePayload,
  normalize::{
    Code, GeoPoint, ObservedAt, array_records, canonical_code, decode_each,
    installed_flag, observation_time, resolve_status,
  },
};

const DATASET: Dataset = Dataset::ParisRealtime;

#[derive(Debug, Clone, Copy, Default)]
pub struct Paris;

#[derive(Deserialize)]
struct StationRecord {
  stationcode:                 Code,
  name:                        String,
  nom_arrondissement_communes: Option<String>,
  code_insee_commune:          Option<Value>,
  coordonnees_geo:             Option<GeoPoint>,
  is_installed:                Value,
  capacity:                    Option<i64>,
}

#[derive(Deserialize)]
struct StatementRecord {
  stationcode:       Code,
  numdocksavailable: Option<i64>,
  numbikesavailable: Option<i64>,
  duedate:           Option<ObservedAt>,
}

/// `OUI` / `NON`, plus the generic installed flags.
fn paris_installed(value: &Value) -> Option<StationStatus> {
  if let Value::String(s) = value {
    match s.trim().to_ascii_uppercase().as_str() {
      "OUI" => return Some(StationStatus::Yes),
      "NON" => return Some(StationStatus::No),
      _ => {}
    }
  }
  installed_flag(value)
}

impl SourceAdapter for Paris {
  fn source(&self) -> Source { Source::Paris }

  fn normalize_station(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStation>> {
    let records = array_records(DATASET, payload.document(DATASET)?)?;

    Ok(decode_each(DATASET, records, "stationcode", |r: StationRecord| {
      let status = resolve_status(
        DATASET,
        "is_installed",
        &r.is_installed,
        paris_installed(&r.is_installed),
        ctx.unknown_status,
      )?;
      let geo = r.coordonnees_geo.unwrap_or_default();
      let city_code = r
        .code_insee_commune
        .as_ref()
        .and_then(canonical_code)
        .unwrap_or_else(|| UNMAPPED_CITY_CODE.to_owned());

      Ok(StagedStation {
        id: Source::Paris.station_id(&r.stationcode.0),
        code: r.stationcode.0,
        name: r.name,
        city_name: r.nom_arrondissement_communes,
        city_code,
        address: None,
        longitude: geo.lon,
        latitude: geo.lat,
        status,
        created_date: ctx.run_date,
        capacity: r.capacity,
      })
    }))
  }

  fn normalize_statement(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStationStatement>> {
    let records = array_records(DATASET, payload.document(DATASET)?)?;

    Ok(decode_each(DATASET, records, "stationcode", |r: StatementRecord| {
      Ok(StagedStationStatement {
        station_id:              Source::Paris.station_id(&r.stationcode.0),
        bicycle_docks_available: r.numdocksavailable,
        bicycle_available:       r.numbikesavailable,
        last_statement_date:     observation_time(DATASET, r.duedate)?,
        created_date:            ctx.run_date,
      })
    }))
  }
}
