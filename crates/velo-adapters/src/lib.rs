//! Source adapters for the velo pipeline.
//!
//! Each operator publishes its own schema, field names, status vocabulary and
//! code scheme. An adapter maps one day's raw documents for its source onto
//! the staging shapes of [`velo_core`]. Pure synchronous code; no network,
//! filesystem or database access.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use velo_adapters::{NormalizeContext, SourcePayload, adapter_for};
//! use velo_core::source::{Dataset, Source};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let raw = br#"[{"number": 12, "name": "00 - POMME", "status": "OPEN"}]"#;
//! let mut payload = SourcePayload::new(date);
//! payload.insert_raw(Dataset::ToulouseRealtime, raw).unwrap();
//!
//! let ctx = NormalizeContext::new(date);
//! let stations = adapter_for(Source::Toulouse)
//!   .normalize_station(&payload, &ctx)
//!   .unwrap();
//! println!("{} staged, {} rejected", stations.rows.len(), stations.rejected.len());
//! ```

mod communes;
mod metropole;
mod montpellier;
mod normalize;
mod paris;

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use velo_core::{
  Error, Result,
  source::{Dataset, Source},
  station::{StagedStation, StagedStationStatement, StationStatus},
};

pub use communes::normalize_cities;
pub use metropole::{Nantes, Toulouse};
pub use montpellier::Montpellier;
pub use paris::Paris;

// ─── Normalization context ───────────────────────────────────────────────────

/// What to do with a status value outside a source's known domain.
///
/// Written as one of `"reject"`, `"assume_yes"` or `"assume_no"`, so it can
/// be set from a single environment variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnknownStatusPolicy {
  /// Reject the record with [`Error::UnknownEnumValue`].
  #[default]
  Reject,
  /// Stage the record with this status instead.
  Assume(StationStatus),
}

impl fmt::Display for UnknownStatusPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Reject => "reject",
      Self::Assume(StationStatus::Yes) => "assume_yes",
      Self::Assume(StationStatus::No) => "assume_no",
    })
  }
}

impl FromStr for UnknownStatusPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "reject" => Ok(Self::Reject),
      "assume_yes" => Ok(Self::Assume(StationStatus::Yes)),
      "assume_no" => Ok(Self::Assume(StationStatus::No)),
      other => Err(format!(
        "unknown status policy {other:?}, expected reject, assume_yes or assume_no"
      )),
    }
  }
}

impl TryFrom<String> for UnknownStatusPolicy {
  type Error = String;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<UnknownStatusPolicy> for String {
  fn from(policy: UnknownStatusPolicy) -> Self { policy.to_string() }
}

/// Parameters threaded through every adapter call.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
  /// Logical ingestion day stamped on every staged row.
  pub run_date:       NaiveDate,
  pub unknown_status: UnknownStatusPolicy,
}

impl NormalizeContext {
  pub fn new(run_date: NaiveDate) -> Self {
    Self { run_date, unknown_status: UnknownStatusPolicy::default() }
  }

  pub fn with_unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
    self.unknown_status = policy;
    self
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The parsed raw documents of one source for one day.
#[derive(Debug, Clone)]
pub struct SourcePayload {
  date:      NaiveDate,
  documents: BTreeMap<Dataset, Value>,
}

impl SourcePayload {
  pub fn new(date: NaiveDate) -> Self {
    Self { date, documents: BTreeMap::new() }
  }

  pub fn with_document(mut self, dataset: Dataset, document: Value) -> Self {
    self.documents.insert(dataset, document);
    self
  }

  /// Parse `raw` as JSON and attach it as `dataset`.
  pub fn insert_raw(&mut self, dataset: Dataset, raw: &[u8]) -> Result<()> {
    let document = serde_json::from_slice(raw)
      .map_err(|source| Error::Json { dataset, source })?;
    self.documents.insert(dataset, document);
    Ok(())
  }

  pub fn date(&self) -> NaiveDate { self.date }

  pub fn document(&self, dataset: Dataset) -> Result<&Value> {
    self
      .documents
      .get(&dataset)
      .ok_or(Error::MissingInput { dataset, date: self.date })
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// A record skipped during normalization; the rest of its batch proceeds.
#[derive(Debug)]
pub struct RejectedRecord {
  pub dataset: Dataset,
  /// Position of the record in its document.
  pub index:   usize,
  /// The record's local code, when one could be read.
  pub code:    Option<String>,
  pub error:   Error,
}

/// Staged rows of one batch, plus the records that could not be staged.
#[derive(Debug)]
pub struct Normalized<T> {
  pub rows:     Vec<T>,
  pub rejected: Vec<RejectedRecord>,
}

impl<T> Default for Normalized<T> {
  fn default() -> Self {
    Self { rows: Vec::new(), rejected: Vec::new() }
  }
}

impl<T> Normalized<T> {
  pub fn is_clean(&self) -> bool { self.rejected.is_empty() }
}

// ─── Adapter trait ───────────────────────────────────────────────────────────

/// Maps one source's raw documents onto the staging shapes.
///
/// A document with the wrong top-level shape fails the whole call with
/// [`Error::SchemaMismatch`]. A single malformed record only lands in
/// [`Normalized::rejected`].
pub trait SourceAdapter: Send + Sync {
  fn source(&self) -> Source;

  fn normalize_station(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStation>>;

  fn normalize_statement(
    &self,
    payload: &SourcePayload,
    ctx: &NormalizeContext,
  ) -> Result<Normalized<StagedStationStatement>>;
}

static PARIS: Paris = Paris;
static NANTES: Nantes = Nantes;
static TOULOUSE: Toulouse = Toulouse;
static MONTPELLIER: Montpellier = Montpellier;

/// The adapter responsible for `source`.
pub fn adapter_for(source: Source) -> &'static dyn SourceAdapter {
  match source {
    Source::Paris => &PARIS,
    Source::Nantes => &NANTES,
    Source::Toulouse => &TOULOUSE,
    Source::Montpellier => &MONTPELLIER,
  }
}
