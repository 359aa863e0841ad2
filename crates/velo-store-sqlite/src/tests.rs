//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use velo_core::{
  aggregate::{AggregateOutcome, AggregateTable},
  city::StagedCity,
  snapshot::{Snapshot, StagingTable},
  station::{StagedStation, StagedStationStatement, StationStatus},
  store::MobilityStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  s.create_consolidate_tables().await.unwrap();
  s.create_aggregate_tables().await.unwrap();
  s
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, d).unwrap() }

fn city(id: &str, name: &str, pop: Option<i64>, date: NaiveDate) -> StagedCity {
  StagedCity {
    id:             id.into(),
    name:           name.into(),
    nb_inhabitants: pop,
    created_date:   date,
  }
}

fn station(id: &str, city_code: &str, date: NaiveDate) -> StagedStation {
  let code = id.split_once('-').map(|(_, c)| c).unwrap_or(id);
  StagedStation {
    id:           id.into(),
    code:         code.into(),
    name:         format!("Station {code}"),
    city_name:    None,
    city_code:    city_code.into(),
    address:      None,
    longitude:    Some(1.44),
    latitude:     Some(43.6),
    status:       StationStatus::Yes,
    created_date: date,
    capacity:     Some(20),
  }
}

fn statement(station_id: &str, bikes: i64, date: NaiveDate) -> StagedStationStatement {
  StagedStationStatement {
    station_id:              station_id.into(),
    bicycle_docks_available: Some(20 - bikes),
    bicycle_available:       Some(bikes),
    last_statement_date:     Some("2024-05-01T10:00:00+00:00".into()),
    created_date:            date,
  }
}

async fn seed_day(s: &SqliteStore, date: NaiveDate) {
  s.insert_cities(vec![
    city("31555", "Toulouse", Some(504_078), date),
    city("44109", "Nantes", Some(320_732), date),
  ])
  .await
  .unwrap();
  s.insert_stations(vec![
    station("3-12", "31555", date),
    station("2-42", "44109", date),
    station("1-99", "0", date),
  ])
  .await
  .unwrap();
  s.insert_station_statements(vec![
    statement("3-12", 12, date),
    statement("2-42", 3, date),
    statement("1-99", 7, date),
  ])
  .await
  .unwrap();
}

async fn build_all(s: &SqliteStore, run_date: NaiveDate) -> [AggregateOutcome; 3] {
  [
    s.build_dim_city().await.unwrap(),
    s.build_dim_station().await.unwrap(),
    s.build_fact_station_statement(run_date).await.unwrap(),
  ]
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_creation_is_idempotent() {
  let s = store().await;
  s.create_consolidate_tables().await.unwrap();
  s.create_aggregate_tables().await.unwrap();
  assert!(s.latest_snapshot(StagingTable::City).await.unwrap().is_none());
}

// ─── Staging ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_day_appends_and_same_day_replaces() {
  let s = store().await;
  s.insert_station_statements(vec![statement("3-12", 1, day(1))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("3-12", 2, day(1))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("3-12", 3, day(2))])
    .await
    .unwrap();

  let first = s.staged_station_statements(day(1)).await.unwrap();
  assert_eq!(first.len(), 1);
  assert_eq!(first[0].bicycle_available, Some(2));
  assert_eq!(s.staged_station_statements(day(2)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn station_rows_round_trip() {
  let s = store().await;
  let st = station("3-12", "31555", day(1));
  s.insert_stations(vec![st.clone()]).await.unwrap();
  assert_eq!(s.staged_stations(day(1)).await.unwrap(), vec![st]);
}

#[tokio::test]
async fn city_rerun_with_null_population_does_not_duplicate() {
  let s = store().await;
  let rows = vec![
    city("75101", "Paris 1er", None, day(1)),
    city("44109", "Nantes", Some(320_732), day(1)),
    city("44109", "Nantes", Some(323_204), day(1)),
  ];
  s.insert_cities(rows.clone()).await.unwrap();
  s.insert_cities(rows).await.unwrap();
  assert_eq!(s.staged_cities(day(1)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn same_day_city_rerun_replaces_the_earlier_population() {
  let s = store().await;
  s.insert_cities(vec![city("44109", "Nantes", Some(330_000), day(1))])
    .await
    .unwrap();
  s.insert_cities(vec![
    city("44109", "Nantes", Some(320_000), day(1)),
    city("31555", "Toulouse", Some(504_078), day(1)),
  ])
  .await
  .unwrap();
  s.insert_cities(vec![city("44109", "Nantes", Some(330_000), day(2))])
    .await
    .unwrap();

  let staged = s.staged_cities(day(1)).await.unwrap();
  assert_eq!(staged.len(), 2);
  assert_eq!(staged[1].nb_inhabitants, Some(320_000));
  assert_eq!(s.staged_cities(day(2)).await.unwrap().len(), 1);

  // Only day 2 is read; rerun day 2 with the corrected value.
  s.insert_cities(vec![city("44109", "Nantes", Some(320_000), day(2))])
    .await
    .unwrap();
  s.build_dim_city().await.unwrap();
  let cities = s.dim_cities().await.unwrap();
  assert_eq!(cities.len(), 1);
  assert_eq!(cities[0].nb_inhabitants, Some(320_000));
}

#[tokio::test]
async fn latest_snapshot_tracks_the_highest_day() {
  let s = store().await;
  s.insert_cities(vec![city("31555", "Toulouse", None, day(2))])
    .await
    .unwrap();
  s.insert_cities(vec![city("31555", "Toulouse", None, day(1))])
    .await
    .unwrap();
  assert_eq!(
    s.latest_snapshot(StagingTable::City).await.unwrap(),
    Some(Snapshot::new(StagingTable::City, day(2)))
  );
}

// ─── Builds ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn builds_on_empty_staging_are_empty_and_keep_targets() {
  let s = store().await;
  let outcomes = build_all(&s, day(1)).await;
  assert!(outcomes.iter().all(AggregateOutcome::is_empty));
  assert_eq!(outcomes[2].target(), AggregateTable::FactStationStatement);
  assert!(s.dim_cities().await.unwrap().is_empty());
}

#[tokio::test]
async fn fact_excludes_unmapped_and_unresolved_stations() {
  let s = store().await;
  seed_day(&s, day(1)).await;
  // References a municipality missing from the registry.
  s.insert_stations(vec![station("4-1", "34172", day(1))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("4-1", 1, day(1))])
    .await
    .unwrap();

  let [_, _, fact] = build_all(&s, day(3)).await;
  let AggregateOutcome::Written(report) = fact else {
    panic!("expected rows, got {fact:?}");
  };
  assert_eq!(report.rows_written, 2);
  assert_eq!(report.excluded_unmapped, 1);
  assert_eq!(report.excluded_unresolved, 1);
  assert_eq!(report.snapshots.len(), 3);

  let facts = s.fact_station_statements().await.unwrap();
  let ids: Vec<_> = facts.iter().map(|f| f.station_id.as_str()).collect();
  assert_eq!(ids, ["2-42", "3-12"]);
  assert!(facts.iter().all(|f| f.created_date == day(3)));
  assert_eq!(facts[1].city_id, "31555");
  assert_eq!(facts[1].bicycle_available, Some(12));
}

#[tokio::test]
async fn aggregation_is_idempotent() {
  let s = store().await;
  seed_day(&s, day(1)).await;

  let first = build_all(&s, day(1)).await;
  let facts = s.fact_station_statements().await.unwrap();
  let stations = s.dim_stations().await.unwrap();
  let second = build_all(&s, day(1)).await;

  assert_eq!(first, second);
  assert_eq!(s.fact_station_statements().await.unwrap(), facts);
  assert_eq!(s.dim_stations().await.unwrap(), stations);
  assert_eq!(stations.len(), 3);
}

#[tokio::test]
async fn builds_read_only_the_latest_partition() {
  let s = store().await;
  seed_day(&s, day(1)).await;
  s.insert_cities(vec![city("31555", "Toulouse", Some(510_000), day(2))])
    .await
    .unwrap();
  s.insert_stations(vec![station("3-12", "31555", day(2))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("3-12", 5, day(2))])
    .await
    .unwrap();

  let [dim_city, ..] = build_all(&s, day(2)).await;
  let AggregateOutcome::Written(report) = dim_city else {
    panic!("expected rows, got {dim_city:?}");
  };
  let latest = s.latest_snapshot(StagingTable::City).await.unwrap();
  assert_eq!(report.snapshots, Vec::from_iter(latest));

  let cities = s.dim_cities().await.unwrap();
  assert_eq!(cities.len(), 1);
  assert_eq!(cities[0].nb_inhabitants, Some(510_000));
  assert_eq!(s.dim_stations().await.unwrap().len(), 1);
  let facts = s.fact_station_statements().await.unwrap();
  assert_eq!(facts.len(), 1);
  assert_eq!(facts[0].bicycle_available, Some(5));
}

#[tokio::test]
async fn zero_row_fact_build_clears_the_target_and_keeps_counts() {
  let s = store().await;
  seed_day(&s, day(1)).await;
  build_all(&s, day(1)).await;
  assert_eq!(s.fact_station_statements().await.unwrap().len(), 2);

  s.insert_cities(vec![city("31555", "Toulouse", Some(504_078), day(2))])
    .await
    .unwrap();
  s.insert_stations(vec![station("1-99", "0", day(2))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("1-99", 7, day(2))])
    .await
    .unwrap();

  let outcome = s.build_fact_station_statement(day(2)).await.unwrap();
  assert!(!outcome.is_empty());
  assert!(outcome.cleared());
  let AggregateOutcome::Written(report) = outcome else {
    panic!("expected a written report, got {outcome:?}");
  };
  assert_eq!(report.rows_written, 0);
  assert_eq!(report.excluded_unmapped, 1);
  assert_eq!(report.excluded_unresolved, 0);
  assert!(report.snapshots.iter().all(|snapshot| snapshot.created_date == day(2)));
  assert!(s.fact_station_statements().await.unwrap().is_empty());
}

#[tokio::test]
async fn dim_city_keeps_one_row_per_code() {
  let s = store().await;
  s.insert_cities(vec![
    city("44109", "Nantes", Some(323_204), day(1)),
    city("44109", "Nantes", Some(320_732), day(1)),
  ])
  .await
  .unwrap();

  let outcome = s.build_dim_city().await.unwrap();
  assert_eq!(outcome.rows_written(), 1);
  let cities = s.dim_cities().await.unwrap();
  assert_eq!(cities[0].nb_inhabitants, Some(323_204));
}

#[tokio::test]
async fn fact_needs_every_snapshot() {
  let s = store().await;
  s.insert_stations(vec![station("3-12", "31555", day(1))])
    .await
    .unwrap();
  s.insert_station_statements(vec![statement("3-12", 4, day(1))])
    .await
    .unwrap();

  let outcome = s.build_fact_station_statement(day(1)).await.unwrap();
  assert_eq!(outcome, AggregateOutcome::Empty(AggregateTable::FactStationStatement));
  assert!(s.fact_station_statements().await.unwrap().is_empty());
  assert_eq!(s.build_dim_station().await.unwrap().rows_written(), 1);
}
