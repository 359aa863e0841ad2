//! Staged entries of the municipality dictionary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A municipality from the national registry, staged on one ingestion day.
///
/// Rows are unique by the full `(id, name, nb_inhabitants)` triple, not by
/// `id` alone: two registry entries sharing a code but differing in name or
/// population both survive staging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StagedCity {
  /// INSEE code.
  pub id:             String,
  pub name:           String,
  pub nb_inhabitants: Option<i64>,
  pub created_date:   NaiveDate,
}
