//! Outcomes of the dimension and fact builds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateTable {
  DimCity,
  DimStation,
  FactStationStatement,
}

impl AggregateTable {
  pub fn table_name(self) -> &'static str {
    match self {
      Self::DimCity => "dim_city",
      Self::DimStation => "dim_station",
      Self::FactStationStatement => "fact_station_statement",
    }
  }
}

impl fmt::Display for AggregateTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.table_name())
  }
}

/// What a build wrote into its target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
  pub target:              AggregateTable,
  pub rows_written:        usize,
  /// The staging partitions the build read from.
  pub snapshots:           Vec<Snapshot>,
  /// Statements dropped because their station carries the unmapped city code.
  pub excluded_unmapped:   usize,
  /// Statements dropped because their station or city is absent from the
  /// latest snapshots.
  pub excluded_unresolved: usize,
}

impl AggregateReport {
  pub fn new(
    target: AggregateTable,
    rows_written: usize,
    snapshots: Vec<Snapshot>,
  ) -> Self {
    Self {
      target,
      rows_written,
      snapshots,
      excluded_unmapped: 0,
      excluded_unresolved: 0,
    }
  }
}

/// Result of one aggregation step.
///
/// `Written` means the target was cleared and refilled, possibly with zero
/// rows. `Empty` means a staging table the build reads holds no snapshot, so
/// the build was skipped and the target keeps its previous contents. Neither
/// is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AggregateOutcome {
  Written(AggregateReport),
  Empty(AggregateTable),
}

impl AggregateOutcome {
  pub fn target(&self) -> AggregateTable {
    match self {
      Self::Written(report) => report.target,
      Self::Empty(target) => *target,
    }
  }

  /// Whether the build was skipped and left its target untouched.
  pub fn is_empty(&self) -> bool { matches!(self, Self::Empty(_)) }

  /// Whether the build ran and left its target with no rows.
  pub fn cleared(&self) -> bool {
    matches!(self, Self::Written(report) if report.rows_written == 0)
  }

  pub fn rows_written(&self) -> usize {
    match self {
      Self::Written(report) => report.rows_written,
      Self::Empty(_) => 0,
    }
  }
}
