//! What each pipeline stage did, returned to the caller and logged.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;
use velo_core::{aggregate::AggregateOutcome, snapshot::StagingTable, source::Source};

/// Where a batch of staged rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
  /// The national municipality registry.
  Registry,
  Source(Source),
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Registry => f.write_str("registry"),
      Self::Source(source) => source.fmt(f),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedBatch {
  pub origin:   Origin,
  pub written:  usize,
  /// Records skipped individually; see the `warn` log for each one.
  pub rejected: usize,
}

/// An origin whose whole contribution was aborted for this run.
#[derive(Debug)]
pub struct SourceFailure {
  pub origin: Origin,
  pub error:  velo_core::Error,
}

/// Outcome of one consolidation entry point.
#[derive(Debug)]
pub struct ConsolidationReport {
  pub table:  StagingTable,
  pub staged: Vec<StagedBatch>,
  pub failed: Vec<SourceFailure>,
}

impl ConsolidationReport {
  pub fn new(table: StagingTable) -> Self {
    Self { table, staged: Vec::new(), failed: Vec::new() }
  }

  pub fn rows_written(&self) -> usize { self.staged.iter().map(|b| b.written).sum() }

  pub fn rows_rejected(&self) -> usize { self.staged.iter().map(|b| b.rejected).sum() }

  /// `true` when no origin failed outright. Rejected records don't count.
  pub fn is_complete(&self) -> bool { self.failed.is_empty() }
}

/// Everything [`crate::Pipeline::run`] did.
#[derive(Debug)]
pub struct RunReport {
  pub run_id:        Uuid,
  pub run_date:      NaiveDate,
  pub consolidation: Vec<ConsolidationReport>,
  pub aggregation:   Vec<AggregateOutcome>,
}

impl RunReport {
  pub fn is_complete(&self) -> bool {
    self.consolidation.iter().all(ConsolidationReport::is_complete)
  }

  pub fn failures(&self) -> impl Iterator<Item = (StagingTable, &SourceFailure)> {
    self
      .consolidation
      .iter()
      .flat_map(|report| report.failed.iter().map(move |f| (report.table, f)))
  }
}
