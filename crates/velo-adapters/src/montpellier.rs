//! Vélomagg' (Montpellier) GBFS feeds.
//!
//! Availability and static metadata come in two GBFS documents; station rows
//! are the inner join of `station_status` and `station_information` on
//! `station_id`. Statements are built from `station_status` alone.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use velo_core::{
  Error, Result,
  source::{Dataset, Source},
  station::{StagedStation, StagedStationStatement, UNMAPPED_CITY_CODE},
};

use crate::{
  NormalizeContext, Normalized, RejectedRecord, SourceAdapter, SourcePayload,
  normalize::{
    Code, ObservedAt, canonical_code, decode_each, gbfs_records,
    installed_flag, observation_time, resolve_status,
  },
};

const STATUS: Dataset = Dataset::MontpellierStationStatus;
const INFORMATION: Dataset = Dataset::MontpellierStationInformation;

#[derive(Debug, Clone, Copy, Default)]
pub struct Montpellier;

#[derive(Deserialize)]
struct StatusRecord {
  station_id:          Code,
  num_bikes_available: Option<i64>,
  num_docks_available: Option<i64>,
  is_installed:        Value,
  last_reported:       Option<ObservedAt>,
}

#[derive(Deserialize)]
struct InformationRecord {
  station_id: Code,
  name:       String,
  lat:        Option<f64>,
  lon:        Option<f64>,
  capacity:   Option<i64>,
  address:    Option<String>,
}

impl SourceAdapter for Montpellier {
  fn source(&self) -> Source { Source::Montpellier }

  fn normalize_station(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStation>> {
    let status_records = gbfs_records(STATUS, payload.document(STATUS)?)?;
    let info_records = gbfs_records(INFORMATION, payload.document(INFORMATION)?)?;

    let info = decode_each(INFORMATION, info_records, "station_id", |r: InformationRecord| {
      Ok(r)
    });
    let mut out = Normalized { rows: Vec::new(), rejected: info.rejected };
    let by_code: HashMap<String, InformationRecord> = info
      .rows
      .into_iter()
      .map(|r| (r.station_id.0.clone(), r))
      .collect();

    let (city_name, city_code) = match Source::Montpellier.municipality() {
      Some(m) => (Some(m.name.to_owned()), m.code.to_owned()),
      None => (None, UNMAPPED_CITY_CODE.to_owned()),
    };

    let statuses = decode_each(STATUS, status_records, "station_id", |r: StatusRecord| {
      let status = resolve_status(
        STATUS,
        "is_installed",
        &r.is_installed,
        installed_flag(&r.is_installed),
        ctx.unknown_status,
      )?;
      Ok((r.station_id.0, status))
    });
    out.rejected.extend(statuses.rejected);

    for (code, status) in statuses.rows {
      let Some(info) = by_code.get(&code) else {
        let index = status_records
          .iter()
          .position(|r| {
            r.get("station_id").and_then(canonical_code).as_deref() == Some(code.as_str())
          })
          .unwrap_or_default();
        out.rejected.push(RejectedRecord {
          dataset: STATUS,
          index,
          code: Some(code),
          error: Error::SchemaMismatch {
            dataset: INFORMATION,
            detail:  "no station_information entry for station".into(),
          },
        });
        continue;
      };

      out.rows.push(StagedStation {
        id: Source::Montpellier.station_id(&code),
        code,
        name: info.name.clone(),
        city_name: city_name.clone(),
        city_code: city_code.clone(),
        address: info.address.clone(),
        longitude: info.lon,
        latitude: info.lat,
        status,
        created_date: ctx.run_date,
        capacity: info.capacity,
      });
    }

    Ok(out)
  }

  fn normalize_statement(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStationStatement>> {
    let records = gbfs_records(STATUS, payload.document(STATUS)?)?;

    Ok(decode_each(STATUS, records, "station_id", |r: StatusRecord| {
      Ok(StagedStationStatement {
        station_id:              Source::Montpellier.station_id(&r.station_id.0),
        bicycle_docks_available: r.num_docks_available,
        bicycle_available:       r.num_bikes_available,
        last_statement_date:     observation_time(STATUS, r.last_reported)?,
        created_date:            ctx.run_date,
      })
    }))
  }
}
