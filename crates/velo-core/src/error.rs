//! Error taxonomy shared by every stage of the pipeline.

use chrono::NaiveDate;
use thiserror::Error;

use crate::source::Dataset;

#[derive(Debug, Error)]
pub enum Error {
  /// The raw document for a dataset was not produced for the run date.
  #[error("missing raw input {dataset} for {date}")]
  MissingInput { dataset: Dataset, date: NaiveDate },

  /// A mandatory field or the expected document shape is absent.
  #[error("schema mismatch in {dataset}: {detail}")]
  SchemaMismatch { dataset: Dataset, detail: String },

  /// A status or boolean value outside the known mapping domain.
  #[error("unknown {field} value {value} in {dataset}")]
  UnknownEnumValue {
    dataset: Dataset,
    field:   &'static str,
    value:   String,
  },

  #[error("failed to read {dataset} for {date}: {source}")]
  Io {
    dataset: Dataset,
    date:    NaiveDate,
    #[source]
    source:  std::io::Error,
  },

  #[error("invalid json in {dataset}: {source}")]
  Json {
    dataset: Dataset,
    #[source]
    source:  serde_json::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
