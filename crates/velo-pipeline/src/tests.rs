//! Pipeline tests over an in-memory provider and an in-memory store.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Value, json};
use velo_adapters::UnknownStatusPolicy;
use velo_core::{
  Error as CoreError,
  aggregate::AggregateOutcome,
  provider::SnapshotProvider,
  source::{Dataset, Source},
  station::StationStatus,
  store::MobilityStore,
};
use velo_store_sqlite::SqliteStore;

use crate::{Origin, Pipeline};

#[derive(Default)]
struct MemoryProvider {
  documents: BTreeMap<(Dataset, NaiveDate), Vec<u8>>,
}

impl MemoryProvider {
  fn with(mut self, dataset: Dataset, date: NaiveDate, document: Value) -> Self {
    self
      .documents
      .insert((dataset, date), serde_json::to_vec(&document).unwrap());
    self
  }
}

impl SnapshotProvider for MemoryProvider {
  async fn read(&self, dataset: Dataset, date: NaiveDate) -> velo_core::Result<Vec<u8>> {
    self
      .documents
      .get(&(dataset, date))
      .cloned()
      .ok_or(CoreError::MissingInput { dataset, date })
  }
}

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() }

/// Every dataset except Montpellier's station information.
fn partial_day() -> MemoryProvider {
  MemoryProvider::default()
    .with(Dataset::Communes, day(), json!([
      { "nom": "Paris", "code": "75056", "population": 2133111 },
      { "nom": "Nantes", "code": "44109", "population": 320732 },
      { "nom": "Toulouse", "code": "31555", "population": 504078 },
      { "nom": "Montpellier", "code": "34172", "population": 299096 }
    ]))
    .with(Dataset::ParisRealtime, day(), json!([{
      "stationcode": "12", "name": "Arsenal", "is_installed": "OUI",
      "capacity": 30, "numdocksavailable": 20, "numbikesavailable": 10,
      "duedate": "2024-05-01T09:58:12+00:00",
      "code_insee_commune": "75056", "nom_arrondissement_communes": "Paris"
    }, {
      "stationcode": "13", "name": "Hors Paris", "is_installed": "OUI",
      "numdocksavailable": 1, "numbikesavailable": 1
    }]))
    .with(Dataset::NantesRealtime, day(), json!([{
      "number": 12, "name": "012- Bouffay", "status": "MAINTENANCE",
      "available_bike_stands": 4, "available_bikes": 6
    }]))
    .with(Dataset::ToulouseRealtime, day(), json!([{
      "number": "12", "name": "00 - Place du Capitole", "status": "OPEN",
      "position": { "lon": 1.44, "lat": 43.60 }, "bike_stands": 20,
      "available_bike_stands": 8, "available_bikes": 12,
      "last_update": "2024-05-01T11:59:03+02:00"
    }]))
    .with(Dataset::MontpellierStationStatus, day(), json!({ "data": { "stations": [{
      "station_id": "12", "num_bikes_available": 3, "num_docks_available": 9,
      "is_installed": 1, "last_reported": 1714557600
    }]}}))
}

async fn pipeline(provider: MemoryProvider) -> Pipeline<SqliteStore, MemoryProvider> {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  Pipeline::new(store, provider, day())
}

#[tokio::test]
async fn failing_source_is_reported_while_others_are_staged() {
  let p = pipeline(partial_day()).await;
  p.create_consolidate_tables().await.unwrap();
  let report = p.consolidate_station_data().await.unwrap();

  assert!(!report.is_complete());
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].origin, Origin::Source(Source::Montpellier));
  assert!(matches!(
    report.failed[0].error,
    CoreError::MissingInput { dataset: Dataset::MontpellierStationInformation, .. }
  ));

  // Paris stages both records, Nantes rejects its unknown status.
  assert_eq!(report.rows_written(), 3);
  assert_eq!(report.rows_rejected(), 1);
  let ids: Vec<_> = p
    .store()
    .staged_stations(day())
    .await
    .unwrap()
    .into_iter()
    .map(|s| s.id)
    .collect();
  assert_eq!(ids, ["1-12", "1-13", "3-12"]);
}

#[tokio::test]
async fn assume_policy_stages_unknown_status() {
  let p = pipeline(partial_day())
    .await
    .with_unknown_status(UnknownStatusPolicy::Assume(StationStatus::No));
  p.create_consolidate_tables().await.unwrap();
  let report = p.consolidate_station_data().await.unwrap();
  assert_eq!(report.rows_rejected(), 0);

  let nantes = p
    .store()
    .staged_stations(day())
    .await
    .unwrap()
    .into_iter()
    .find(|s| s.id == "2-12")
    .unwrap();
  assert_eq!(nantes.status, StationStatus::No);
  assert_eq!(nantes.name, "Bouffay");
}

#[tokio::test]
async fn statements_do_not_need_station_information() {
  let p = pipeline(partial_day()).await;
  p.create_consolidate_tables().await.unwrap();
  let report = p.consolidate_station_statement_data().await.unwrap();
  assert!(report.is_complete());
  assert_eq!(report.rows_written(), 5);
}

#[tokio::test]
async fn run_builds_the_star_schema_and_is_repeatable() {
  let p = pipeline(partial_day()).await;
  let first = p.run().await.unwrap();
  assert!(!first.is_complete());
  assert_eq!(first.failures().count(), 1);

  let [dim_city, dim_station, fact] = first.aggregation.as_slice() else {
    panic!("expected three aggregation outcomes");
  };
  assert_eq!(dim_city.rows_written(), 4);
  assert_eq!(dim_station.rows_written(), 3);
  let AggregateOutcome::Written(fact) = fact else {
    panic!("expected fact rows, got {fact:?}");
  };
  // 1-13 has no municipality; the Nantes and Montpellier statements have no
  // staged station.
  assert_eq!(fact.rows_written, 2);
  assert_eq!(fact.excluded_unmapped, 1);
  assert_eq!(fact.excluded_unresolved, 2);

  let facts = p.store().fact_station_statements().await.unwrap();
  let second = p.run().await.unwrap();
  assert_eq!(second.aggregation, first.aggregation);
  assert_eq!(p.store().fact_station_statements().await.unwrap(), facts);
  assert!(facts.iter().all(|f| f.city_id != "0"));
}

#[tokio::test]
async fn missing_registry_fails_city_consolidation_only() {
  let p = pipeline(MemoryProvider::default()).await;
  p.create_consolidate_tables().await.unwrap();
  let report = p.consolidate_city_data().await.unwrap();
  assert_eq!(report.failed[0].origin, Origin::Registry);
  assert_eq!(report.rows_written(), 0);
}
