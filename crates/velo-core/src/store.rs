//! The `MobilityStore` trait.
//!
//! Implemented by relational backends (e.g. `velo-store-sqlite`). The
//! pipeline depends on this abstraction, not on a concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  aggregate::AggregateOutcome,
  city::StagedCity,
  snapshot::{Snapshot, StagingTable},
  star::{DimCity, DimStation, FactStationStatement},
  station::{StagedStation, StagedStationStatement},
};

/// Staging tables plus the star schema built from them.
///
/// Staging writes are append-only across days and replace-by-key within a
/// day, so a same-day rerun overwrites instead of duplicating. Every build
/// fully replaces its target from the latest staging snapshot.
pub trait MobilityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Consolidation ─────────────────────────────────────────────────────

  /// Create the three staging tables. Idempotent.
  fn create_consolidate_tables(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace every row already staged for an `(id, created_date)` in the
  /// batch, then insert the batch. Rows repeating the full
  /// `(id, name, nb_inhabitants)` triple collapse to one. Returns the number
  /// of rows submitted.
  fn insert_cities(
    &self,
    rows: Vec<StagedCity>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert-or-replace by `(id, created_date)`.
  fn insert_stations(
    &self,
    rows: Vec<StagedStation>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Insert-or-replace by `(station_id, created_date)`.
  fn insert_station_statements(
    &self,
    rows: Vec<StagedStationStatement>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// `max(created_date)` of `table`, or `None` when the table is empty.
  fn latest_snapshot(
    &self,
    table: StagingTable,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  fn staged_cities(
    &self,
    created_date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<StagedCity>, Self::Error>> + Send + '_;

  fn staged_stations(
    &self,
    created_date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<StagedStation>, Self::Error>> + Send + '_;

  fn staged_station_statements(
    &self,
    created_date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<StagedStationStatement>, Self::Error>>
  + Send
  + '_;

  // ── Aggregation ───────────────────────────────────────────────────────

  /// Create the dimension and fact tables. Idempotent.
  fn create_aggregate_tables(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Rebuild `dim_city` from the latest city snapshot.
  ///
  /// Each build resolves its partitions through [`Self::latest_snapshot`].
  /// It returns [`AggregateOutcome::Empty`] without touching the target when
  /// a table it reads has no snapshot.
  fn build_dim_city(
    &self,
  ) -> impl Future<Output = Result<AggregateOutcome, Self::Error>> + Send + '_;

  /// Rebuild `dim_station` from the latest station snapshot.
  fn build_dim_station(
    &self,
  ) -> impl Future<Output = Result<AggregateOutcome, Self::Error>> + Send + '_;

  /// Rebuild `fact_station_statement` by joining the latest statement,
  /// station and city snapshots. Rows are stamped with `run_date`.
  ///
  /// Expects both dimensions to have been rebuilt for the same ingestion
  /// day; this is not checked.
  fn build_fact_station_statement(
    &self,
    run_date: NaiveDate,
  ) -> impl Future<Output = Result<AggregateOutcome, Self::Error>> + Send + '_;

  // ── Star schema reads ─────────────────────────────────────────────────

  fn dim_cities(
    &self,
  ) -> impl Future<Output = Result<Vec<DimCity>, Self::Error>> + Send + '_;

  fn dim_stations(
    &self,
  ) -> impl Future<Output = Result<Vec<DimStation>, Self::Error>> + Send + '_;

  fn fact_station_statements(
    &self,
  ) -> impl Future<Output = Result<Vec<FactStationStatement>, Self::Error>>
  + Send
  + '_;
}
