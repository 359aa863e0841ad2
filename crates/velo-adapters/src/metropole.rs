//! Nantes Métropole and Toulouse Métropole realtime availability.
//!
//! Both publish the same record layout as a top-level array: `number` as the
//! local code, names prefixed with a numeric tag, an `OPEN`/`CLOSED` status
//! and a flat `position` object. Each covers a single municipality.

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
    Code, GeoPoint, ObservedAt, array_records, decode_each, observation_time,
    resolve_status, strip_name_prefix,
  },
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Nantes;

#[derive(Debug, Clone, Copy, Default)]
pub struct Toulouse;

#[derive(Deserialize)]
struct StationRecord {
  number:      Code,
  name:        String,
  address:     Option<String>,
  position:    Option<GeoPoint>,
  status:      Value,
  bike_stands: Option<i64>,
}

#[derive(Deserialize)]
struct StatementRecord {
  number:                Code,
  available_bike_stands: Option<i64>,
  available_bikes:       Option<i64>,
  last_update:           Option<ObservedAt>,
}

fn open_closed(value: &Value) -> Option<StationStatus> {
  match value.as_str()?.trim().to_ascii_uppercase().as_str() {
    "OPEN" => Some(StationStatus::Yes),
    "CLOSED" => Some(StationStatus::No),
    _ => None,
  }
}

fn dataset(source: Source) -> Dataset {
  match source {
    Source::Toulouse => Dataset::ToulouseRealtime,
    _ => Dataset::NantesRealtime,
  }
}

fn stations(
  source: Source,
  payload: &SourcePayload,
  ctx: &NormalizeContext,
) -> Result<Normalized<StagedStation>> {
  let dataset = dataset(source);
  let records = array_records(dataset, payload.document(dataset)?)?;
  let (city_name, city_code) = match source.municipality() {
    Some(m) => (Some(m.name.to_owned()), m.code.to_owned()),
    None => (None, UNMAPPED_CITY_CODE.to_owned()),
  };

  Ok(decode_each(dataset, records, "number", |r: StationRecord| {
    let status = resolve_status(
      dataset,
      "status",
      &r.status,
      open_closed(&r.status),
      ctx.unknown_status,
    )?;
    let position = r.position.unwrap_or_default();

    Ok(StagedStation {
      id: source.station_id(&r.number.0),
      code: r.number.0,
      name: strip_name_prefix(&r.name).to_owned(),
      city_name: city_name.clone(),
      city_code: city_code.clone(),
      address: r.address,
      longitude: position.lon,
      latitude: position.lat,
      status,
      created_date: ctx.run_date,
      capacity: r.bike_stands,
    })
  }))
}

fn statements(
  source: Source,
  payload: &SourcePayload,
  ctx: &NormalizeContext,
) -> Result<Normalized<StagedStationStatement>> {
  let dataset = dataset(source);
  let records = array_records(dataset, payload.document(dataset)?)?;

  Ok(decode_each(dataset, records, "number", |r: StatementRecord| {
    Ok(StagedStationStatement {
      station_id:              source.station_id(&r.number.0),
      bicycle_docks_available: r.available_bike_stands,
      bicycle_available:       r.available_bikes,
      last_statement_date:     observation_time(dataset, r.last_update)?,
      created_date:            ctx.run_date,
    })
  }))
}

impl SourceAdapter for Nantes {
  fn source(&self) -> Source { Source::Nantes }

  fn normalize_station(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStation>> {
    stations(Source::Nantes, payload, ctx)
  }

  fn normalize_statement(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStationStatement>> {
    statements(Source::Nantes, payload, ctx)
  }
}

impl SourceAdapter for Toulouse {
  fn source(&self) -> Source { Source::Toulouse }

  fn normalize_station(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStation>> {
    stations(Source::Toulouse, payload, ctx)
  }

  fn normalize_statement(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStationStatement>> {
    statements(Source::Toulouse, payload, ctx)
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use serde_json::json;
  use velo_core::Error;

  use super::*;
  use crate::UnknownStatusPolicy;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() }

  fn toulouse(document: Value) -> SourcePayload {
    SourcePayload::new(date()).with_document(Dataset::ToulouseRealtime, document)
  }

  #[test]
  fn toulouse_capitole_record() {
    let payload = toulouse(json!([{
      "number": "12",
      "name": "00 - Place du Capitole",
      "status": "OPEN",
      "position": { "lon": 1.44, "lat": 43.60 },
      "bike_stands": 20
    }]));
    let out = Toulouse
      .normalize_station(&payload, &NormalizeContext::new(date()))
      .unwrap();

    assert_eq!(out.rows, vec![StagedStation {
      id:           "3-12".into(),
      code:         "12".into(),
      name:         "Place du Capitole".into(),
      city_name:    Some("Toulouse".into()),
      city_code:    "31555".into(),
      address:      None,
      longitude:    Some(1.44),
      latitude:     Some(43.60),
      status:       StationStatus::Yes,
      created_date: date(),
      capacity:     Some(20),
    }]);
  }

  #[test]
  fn nantes_numeric_code_and_address() {
    let payload = SourcePayload::new(date()).with_document(
      Dataset::NantesRealtime,
      json!([{
        "number": 42,
        "name": "042- Commerce",
        "address": "Place du Commerce",
        "status": "CLOSED",
        "bike_stands": 15
      }]),
    );
    let out = Nantes
      .normalize_station(&payload, &NormalizeContext::new(date()))
      .unwrap();
    let s = &out.rows[0];
    assert_eq!(s.id, "2-42");
    assert_eq!(s.name, "Commerce");
    assert_eq!(s.address.as_deref(), Some("Place du Commerce"));
    assert_eq!(s.city_code, "44109");
    assert_eq!(s.status, StationStatus::No);
    assert_eq!(s.longitude, None);
  }

  #[test]
  fn unknown_status_under_each_policy() {
    let payload = toulouse(json!([
      { "number": 1, "name": "01 - A", "status": "WORKS" },
      { "number": 2, "name": "02 - B", "status": "OPEN" }
    ]));

    let strict = Toulouse
      .normalize_station(&payload, &NormalizeContext::new(date()))
      .unwrap();
    assert_eq!(strict.rows.len(), 1);
    assert!(matches!(
      strict.rejected[0].error,
      Error::UnknownEnumValue { field: "status", .. }
    ));

    let lenient_ctx = NormalizeContext::new(date())
      .with_unknown_status(UnknownStatusPolicy::Assume(StationStatus::No));
    let lenient = Toulouse.normalize_station(&payload, &lenient_ctx).unwrap();
    assert_eq!(lenient.rows.len(), 2);
    assert_eq!(lenient.rows[0].status, StationStatus::No);
  }

  #[test]
  fn statements_pass_last_update_through() {
    let payload = toulouse(json!([{
      "number": 12,
      "available_bike_stands": 8,
      "available_bikes": 12,
      "last_update": "2024-05-01T11:59:03+02:00"
    }, {
      "number": 13,
      "available_bike_stands": 3,
      "available_bikes": 0,
      "last_update": null
    }]));
    let out = Toulouse
      .normalize_statement(&payload, &NormalizeContext::new(date()))
      .unwrap();
    assert_eq!(out.rows[0].station_id, "3-12");
    assert_eq!(out.rows[0].bicycle_available, Some(12));
    assert_eq!(
      out.rows[0].last_statement_date.as_deref(),
      Some("2024-05-01T11:59:03+02:00")
    );
    assert_eq!(out.rows[1].last_statement_date, None);
  }
}
