//! [`SqliteStore`], the SQLite implementation of [`MobilityStore`].

use std::{collections::HashSet, path::Path};

use chrono::NaiveDate;
use rusqlite::params;
use tracing::debug;
use velo_core::{
  aggregate::{AggregateOutcome, AggregateReport, AggregateTable},
  city::StagedCity,
  snapshot::{Snapshot, StagingTable},
  star::{DimCity, DimStation, FactStationStatement},
  station::{StagedStation, StagedStationStatement},
  store::MobilityStore,
};

use crate::{
  Result, aggregate,
  encode::{
    RawDimStation, RawFact, RawStagedCity, RawStagedStatement, RawStagedStation,
    decode_date, dim_city_from_row, encode_date, encode_status,
  },
  schema::{AGGREGATE_SCHEMA, CONSOLIDATE_SCHEMA, PRAGMAS},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The velo staging and star tables in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted and every
/// clone talks to the same connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) the database at `path`. Tables are created by
  /// [`MobilityStore::create_consolidate_tables`] and
  /// [`MobilityStore::create_aggregate_tables`].
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.apply_pragmas().await?;
    Ok(store)
  }

  async fn apply_pragmas(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn execute_schema(&self, schema: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(schema)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn finish_build(
    target: AggregateTable,
    report: Option<AggregateReport>,
  ) -> AggregateOutcome {
    let outcome = match report {
      Some(report) => AggregateOutcome::Written(report),
      None => AggregateOutcome::Empty(target),
    };
    debug!(table = %target, rows = outcome.rows_written(), "build finished");
    outcome
  }
}

// ─── MobilityStore impl ──────────────────────────────────────────────────────

impl MobilityStore for SqliteStore {
  type Error = crate::Error;

  async fn create_consolidate_tables(&self) -> Result<()> {
    self.execute_schema(CONSOLIDATE_SCHEMA).await
  }

  async fn insert_cities(&self, rows: Vec<StagedCity>) -> Result<usize> {
    let submitted = rows.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          // A rerun replaces every row the earlier run staged for an id on
          // that day, whatever its name or population.
          let days: HashSet<(&str, String)> = rows
            .iter()
            .map(|city| (city.id.as_str(), encode_date(city.created_date)))
            .collect();
          let mut delete = tx.prepare(
            "DELETE FROM consolidate_city WHERE id = ?1 AND created_date = ?2",
          )?;
          for (id, created) in &days {
            delete.execute(params![id, created])?;
          }

          let mut insert = tx.prepare(
            "INSERT OR REPLACE INTO consolidate_city
               (id, name, nb_inhabitants, created_date)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for city in &rows {
            let created = encode_date(city.created_date);
            insert.execute(params![city.id, city.name, city.nb_inhabitants, created])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(submitted)
  }

  async fn insert_stations(&self, rows: Vec<StagedStation>) -> Result<usize> {
    let submitted = rows.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut insert = tx.prepare(
            "INSERT OR REPLACE INTO consolidate_station
               (id, code, name, city_name, city_code, address, longitude,
                latitude, status, created_date, capacity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          )?;
          for s in &rows {
            let created = encode_date(s.created_date);
            insert.execute(params![
              s.id,
              s.code,
              s.name,
              s.city_name,
              s.city_code,
              s.address,
              s.longitude,
              s.latitude,
              encode_status(s.status),
              created,
              s.capacity,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(submitted)
  }

  async fn insert_station_statements(
    &self,
    rows: Vec<StagedStationStatement>,
  ) -> Result<usize> {
    let submitted = rows.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut insert = tx.prepare(
            "INSERT OR REPLACE INTO consolidate_station_statement
               (station_id, bicycle_docks_available, bicycle_available,
                last_statement_date, created_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for st in &rows {
            let created = encode_date(st.created_date);
            insert.execute(params![
              st.station_id,
              st.bicycle_docks_available,
              st.bicycle_available,
              st.last_statement_date,
              created,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(submitted)
  }

  async fn latest_snapshot(&self, table: StagingTable) -> Result<Option<Snapshot>> {
    let latest = self
      .conn
      .call(move |conn| Ok(aggregate::latest_created_date(conn, table)?))
      .await?;

    latest
      .map(|date| Ok(Snapshot::new(table, decode_date(&date)?)))
      .transpose()
  }

  async fn staged_cities(&self, created_date: NaiveDate) -> Result<Vec<StagedCity>> {
    let date = encode_date(created_date);
    let raws: Vec<RawStagedCity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, nb_inhabitants, created_date
             FROM consolidate_city
            WHERE created_date = ?1
            ORDER BY id, name, nb_inhabitants",
        )?;
        let rows = stmt
          .query_map(params![date], RawStagedCity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStagedCity::into_city).collect()
  }

  async fn staged_stations(
    &self,
    created_date: NaiveDate,
  ) -> Result<Vec<StagedStation>> {
    let date = encode_date(created_date);
    let raws: Vec<RawStagedStation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, code, name, city_name, city_code, address, longitude,
                  latitude, status, created_date, capacity
             FROM consolidate_station
            WHERE created_date = ?1
            ORDER BY id",
        )?;
        let rows = stmt
          .query_map(params![date], RawStagedStation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStagedStation::into_station).collect()
  }

  async fn staged_station_statements(
    &self,
    created_date: NaiveDate,
  ) -> Result<Vec<StagedStationStatement>> {
    let date = encode_date(created_date);
    let raws: Vec<RawStagedStatement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT station_id, bicycle_docks_available, bicycle_available,
                  last_statement_date, created_date
             FROM consolidate_station_statement
            WHERE created_date = ?1
            ORDER BY station_id",
        )?;
        let rows = stmt
          .query_map(params![date], RawStagedStatement::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStagedStatement::into_statement).collect()
  }

  async fn create_aggregate_tables(&self) -> Result<()> {
    self.execute_schema(AGGREGATE_SCHEMA).await
  }

  async fn build_dim_city(&self) -> Result<AggregateOutcome> {
    let Some(city) = self.latest_snapshot(StagingTable::City).await? else {
      return Ok(Self::finish_build(AggregateTable::DimCity, None));
    };
    let report = self
      .conn
      .call(move |conn| Ok(aggregate::build_dim_city(conn, city)?))
      .await?;
    Ok(Self::finish_build(AggregateTable::DimCity, Some(report)))
  }

  async fn build_dim_station(&self) -> Result<AggregateOutcome> {
    let Some(station) = self.latest_snapshot(StagingTable::Station).await? else {
      return Ok(Self::finish_build(AggregateTable::DimStation, None));
    };
    let report = self
      .conn
      .call(move |conn| Ok(aggregate::build_dim_station(conn, station)?))
      .await?;
    Ok(Self::finish_build(AggregateTable::DimStation, Some(report)))
  }

  async fn build_fact_station_statement(
    &self,
    run_date: NaiveDate,
  ) -> Result<AggregateOutcome> {
    let target = AggregateTable::FactStationStatement;
    let statement = self.latest_snapshot(StagingTable::StationStatement).await?;
    let station = self.latest_snapshot(StagingTable::Station).await?;
    let city = self.latest_snapshot(StagingTable::City).await?;
    let (Some(statement), Some(station), Some(city)) = (statement, station, city) else {
      return Ok(Self::finish_build(target, None));
    };

    let run_date = encode_date(run_date);
    let report = self
      .conn
      .call(move |conn| {
        Ok(aggregate::build_fact_station_statement(
          conn,
          [statement, station, city],
          run_date,
        )?)
      })
      .await?;
    Ok(Self::finish_build(target, Some(report)))
  }

  async fn dim_cities(&self) -> Result<Vec<DimCity>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name, nb_inhabitants FROM dim_city ORDER BY id")?;
        let rows = stmt
          .query_map([], dim_city_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn dim_stations(&self) -> Result<Vec<DimStation>> {
    let raws: Vec<RawDimStation> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, code, name, address, longitude, latitude, status, capacity
             FROM dim_station
            ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], RawDimStation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDimStation::into_dim).collect()
  }

  async fn fact_station_statements(&self) -> Result<Vec<FactStationStatement>> {
    let raws: Vec<RawFact> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT station_id, city_id, bicycle_docks_available, bicycle_available,
                  last_statement_date, created_date
             FROM fact_station_statement
            ORDER BY station_id, city_id",
        )?;
        let rows = stmt
          .query_map([], RawFact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFact::into_fact).collect()
  }
}
