//! Runtime configuration, loaded by the binary through the `config` crate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use velo_adapters::UnknownStatusPolicy;

/// `velo.toml` keys, each overridable by a `VELO_`-prefixed variable
/// (`VELO_STORE_PATH`, `VELO_RAW_DATA_DIR`, `VELO_UNKNOWN_STATUS`).
///
/// `unknown_status` takes `reject`, `assume_yes` or `assume_no`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// SQLite database holding the staging and star tables.
  pub store_path:     PathBuf,
  /// Root of the per-day raw snapshot directories.
  pub raw_data_dir:   PathBuf,
  pub unknown_status: UnknownStatusPolicy,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("data/duckdb/mobility_analysis.sqlite"),
      raw_data_dir:   PathBuf::from("data/raw_data"),
      unknown_status: UnknownStatusPolicy::Reject,
    }
  }
}
