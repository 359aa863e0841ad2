//! Orchestration of the velo consolidation and aggregation pipeline.
//!
//! [`Pipeline`] owns a [`MobilityStore`], a [`SnapshotProvider`] and the run
//! date. Its entry points are each safe to rerun: staging writes replace by
//! key within a day and every build clears its target first.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = SqliteStore::open("data/duckdb/mobility_analysis.sqlite").await?;
//! let provider = DirectoryProvider::new("data/raw_data");
//! let report = Pipeline::new(store, provider, run_date).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod report;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use velo_adapters::{
  NormalizeContext, Normalized, SourcePayload, UnknownStatusPolicy, adapter_for,
  normalize_cities,
};
use velo_core::{
  aggregate::AggregateOutcome,
  provider::SnapshotProvider,
  snapshot::StagingTable,
  source::{Dataset, Source},
  store::MobilityStore,
};

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use provider::DirectoryProvider;
pub use report::{ConsolidationReport, Origin, RunReport, SourceFailure, StagedBatch};

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline<S, P> {
  store:          S,
  provider:       P,
  run_date:       NaiveDate,
  unknown_status: UnknownStatusPolicy,
}

impl<S, P> Pipeline<S, P>
where
  S: MobilityStore,
  P: SnapshotProvider,
{
  pub fn new(store: S, provider: P, run_date: NaiveDate) -> Self {
    Self {
      store,
      provider,
      run_date,
      unknown_status: UnknownStatusPolicy::default(),
    }
  }

  pub fn with_unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
    self.unknown_status = policy;
    self
  }

  pub fn run_date(&self) -> NaiveDate { self.run_date }

  pub fn store(&self) -> &S { &self.store }

  fn context(&self) -> NormalizeContext {
    NormalizeContext::new(self.run_date).with_unknown_status(self.unknown_status)
  }

  /// Read and parse the documents in `datasets` saved for the run date.
  ///
  /// An absent document is left out of the payload, so the adapter reports
  /// `MissingInput` only for a document the current step actually reads.
  async fn load(&self, datasets: &[Dataset]) -> velo_core::Result<SourcePayload> {
    let mut payload = SourcePayload::new(self.run_date);
    for &dataset in datasets {
      match self.provider.read(dataset, self.run_date).await {
        Ok(raw) => payload.insert_raw(dataset, &raw)?,
        Err(velo_core::Error::MissingInput { .. }) => {
          debug!(%dataset, "raw snapshot absent");
        }
        Err(error) => return Err(error),
      }
    }
    Ok(payload)
  }

  /// Log rejections and keep the rows, or record the origin as failed.
  fn accept<T>(
    report: &mut ConsolidationReport,
    origin: Origin,
    result: velo_core::Result<Normalized<T>>,
  ) -> Option<(Vec<T>, usize)> {
    match result {
      Ok(normalized) => {
        for r in &normalized.rejected {
          warn!(
            %origin,
            dataset = %r.dataset,
            index = r.index,
            code = r.code.as_deref().unwrap_or("?"),
            error = %r.error,
            "record rejected"
          );
        }
        let rejected = normalized.rejected.len();
        Some((normalized.rows, rejected))
      }
      Err(error) => {
        warn!(%origin, table = %report.table, %error, "source failed");
        report.failed.push(SourceFailure { origin, error });
        None
      }
    }
  }

  fn finish(report: ConsolidationReport) -> ConsolidationReport {
    info!(
      table = %report.table,
      written = report.rows_written(),
      rejected = report.rows_rejected(),
      failed = report.failed.len(),
      "consolidation finished"
    );
    report
  }

  // ── Consolidation ─────────────────────────────────────────────────────

  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn create_consolidate_tables(&self) -> Result<()> {
    self
      .store
      .create_consolidate_tables()
      .await
      .map_err(Error::store)
  }

  /// Stage the municipality registry.
  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn consolidate_city_data(&self) -> Result<ConsolidationReport> {
    let mut report = ConsolidationReport::new(StagingTable::City);
    let result = self.load(&[Dataset::Communes]).await.and_then(|payload| {
      normalize_cities(payload.document(Dataset::Communes)?, self.run_date)
    });

    if let Some((rows, rejected)) = Self::accept(&mut report, Origin::Registry, result) {
      let written = self.store.insert_cities(rows).await.map_err(Error::store)?;
      report.staged.push(StagedBatch { origin: Origin::Registry, written, rejected });
    }
    Ok(Self::finish(report))
  }

  /// Stage station metadata from every source. A source that fails is
  /// reported and skipped; the others are still staged.
  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn consolidate_station_data(&self) -> Result<ConsolidationReport> {
    let mut report = ConsolidationReport::new(StagingTable::Station);
    let ctx = self.context();

    for source in Source::ALL {
      let origin = Origin::Source(source);
      let adapter = adapter_for(source);
      let result = self
        .load(source.datasets())
        .await
        .and_then(|payload| adapter.normalize_station(&payload, &ctx));

      if let Some((rows, rejected)) = Self::accept(&mut report, origin, result) {
        let written = self.store.insert_stations(rows).await.map_err(Error::store)?;
        debug!(%origin, written, "stations staged");
        report.staged.push(StagedBatch { origin, written, rejected });
      }
    }
    Ok(Self::finish(report))
  }

  /// Stage availability statements from every source.
  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn consolidate_station_statement_data(&self) -> Result<ConsolidationReport> {
    let mut report = ConsolidationReport::new(StagingTable::StationStatement);
    let ctx = self.context();

    for source in Source::ALL {
      let origin = Origin::Source(source);
      let adapter = adapter_for(source);
      let result = self
        .load(source.datasets())
        .await
        .and_then(|payload| adapter.normalize_statement(&payload, &ctx));

      if let Some((rows, rejected)) = Self::accept(&mut report, origin, result) {
        let written = self
          .store
          .insert_station_statements(rows)
          .await
          .map_err(Error::store)?;
        debug!(%origin, written, "statements staged");
        report.staged.push(StagedBatch { origin, written, rejected });
      }
    }
    Ok(Self::finish(report))
  }

  /// Every consolidation entry point, in order.
  pub async fn consolidate(&self) -> Result<Vec<ConsolidationReport>> {
    self.create_consolidate_tables().await?;
    Ok(vec![
      self.consolidate_city_data().await?,
      self.consolidate_station_data().await?,
      self.consolidate_station_statement_data().await?,
    ])
  }

  // ── Aggregation ───────────────────────────────────────────────────────

  fn log_outcome(outcome: &AggregateOutcome) {
    match outcome {
      AggregateOutcome::Written(report) => {
        for snapshot in &report.snapshots {
          debug!(%snapshot, "read snapshot");
        }
        if report.rows_written == 0 {
          warn!(
            table = %report.target,
            excluded_unmapped = report.excluded_unmapped,
            excluded_unresolved = report.excluded_unresolved,
            "target cleared, no rows selected"
          );
          return;
        }
        info!(
          table = %report.target,
          rows = report.rows_written,
          excluded_unmapped = report.excluded_unmapped,
          excluded_unresolved = report.excluded_unresolved,
          "aggregation finished"
        );
      }
      AggregateOutcome::Empty(target) => {
        warn!(table = %target, "nothing to aggregate, target left as is");
      }
    }
  }

  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn create_aggregate_tables(&self) -> Result<()> {
    self
      .store
      .create_aggregate_tables()
      .await
      .map_err(Error::store)
  }

  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn aggregate_dim_city(&self) -> Result<AggregateOutcome> {
    let outcome = self.store.build_dim_city().await.map_err(Error::store)?;
    Self::log_outcome(&outcome);
    Ok(outcome)
  }

  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn aggregate_dim_station(&self) -> Result<AggregateOutcome> {
    let outcome = self.store.build_dim_station().await.map_err(Error::store)?;
    Self::log_outcome(&outcome);
    Ok(outcome)
  }

  /// Call after both dimensions have been rebuilt for this run.
  #[instrument(skip(self), fields(run_date = %self.run_date))]
  pub async fn aggregate_fact_station_statement(&self) -> Result<AggregateOutcome> {
    let outcome = self
      .store
      .build_fact_station_statement(self.run_date)
      .await
      .map_err(Error::store)?;
    Self::log_outcome(&outcome);
    Ok(outcome)
  }

  /// Every aggregation entry point, dimensions before the fact.
  pub async fn aggregate(&self) -> Result<Vec<AggregateOutcome>> {
    self.create_aggregate_tables().await?;
    Ok(vec![
      self.aggregate_dim_city().await?,
      self.aggregate_dim_station().await?,
      self.aggregate_fact_station_statement().await?,
    ])
  }

  /// Consolidate then aggregate.
  pub async fn run(&self) -> Result<RunReport> {
    let run_id = Uuid::new_v4();
    info!(%run_id, run_date = %self.run_date, "run started");

    let consolidation = self.consolidate().await?;
    let aggregation = self.aggregate().await?;
    let report = RunReport { run_id, run_date: self.run_date, consolidation, aggregation };

    if report.is_complete() {
      info!(%run_id, "run finished");
    } else {
      warn!(%run_id, failed = report.failures().count(), "run finished with failed sources");
    }
    Ok(report)
  }
}

#[cfg(test)]
mod tests;
