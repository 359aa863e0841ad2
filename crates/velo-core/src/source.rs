//! Data sources and the raw datasets each one publishes.
//!
//! Every source owns a fixed city namespace. Station identifiers are built as
//! `"{namespace}-{local_code}"` so that two operators reusing the same small
//! integer codes never collide in the staging tables.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Source ──────────────────────────────────────────────────────────────────

/// A bicycle-share operator whose open-data feed is consolidated.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Paris,
  Nantes,
  Toulouse,
  Montpellier,
}

/// A municipality as identified by its INSEE code in the national registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Municipality {
  pub name: &'static str,
  pub code: &'static str,
}

impl Source {
  /// All sources, in the order the pipeline consolidates them.
  pub const ALL: [Source; 4] = [
    Source::Paris,
    Source::Nantes,
    Source::Toulouse,
    Source::Montpellier,
  ];

  /// The fixed integer prefix of every station id from this source.
  pub fn namespace(self) -> u8 {
    match self {
      Self::Paris => 1,
      Self::Nantes => 2,
      Self::Toulouse => 3,
      Self::Montpellier => 4,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Paris => "paris",
      Self::Nantes => "nantes",
      Self::Toulouse => "toulouse",
      Self::Montpellier => "montpellier",
    }
  }

  /// The municipality every station of this source belongs to, for sources
  /// that cover exactly one. Paris reports it per station.
  pub fn municipality(self) -> Option<Municipality> {
    match self {
      Self::Paris => None,
      Self::Nantes => Some(Municipality { name: "Nantes", code: "44109" }),
      Self::Toulouse => Some(Municipality { name: "Toulouse", code: "31555" }),
      Self::Montpellier => {
        Some(Municipality { name: "Montpellier", code: "34172" })
      }
    }
  }

  /// The raw documents needed to normalize this source for one day.
  pub fn datasets(self) -> &'static [Dataset] {
    match self {
      Self::Paris => &[Dataset::ParisRealtime],
      Self::Nantes => &[Dataset::NantesRealtime],
      Self::Toulouse => &[Dataset::ToulouseRealtime],
      Self::Montpellier => &[
        Dataset::MontpellierStationStatus,
        Dataset::MontpellierStationInformation,
      ],
    }
  }

  /// Build the namespaced station id for a canonical local code.
  pub fn station_id(self, local_code: &str) -> String {
    format!("{}-{local_code}", self.namespace())
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

// ─── Dataset ─────────────────────────────────────────────────────────────────

/// One raw JSON document written by the ingestion fetcher for a given day.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
  ParisRealtime,
  NantesRealtime,
  ToulouseRealtime,
  MontpellierStationStatus,
  MontpellierStationInformation,
  /// The national municipality registry.
  Communes,
}

impl Dataset {
  /// File name under the per-day raw data directory.
  pub fn file_name(self) -> &'static str {
    match self {
      Self::ParisRealtime => "paris_realtime_bicycle_data.json",
      Self::NantesRealtime => "nantes_realtime_bicycle_data.json",
      Self::ToulouseRealtime => "toulouse_realtime_bicycle_data.json",
      Self::MontpellierStationStatus => {
        "montpellier_realtime_bicycle_station_status_data.json"
      }
      Self::MontpellierStationInformation => {
        "montpellier_realtime_bicycle_station_information_data.json"
      }
      Self::Communes => "commune_data.json",
    }
  }
}

impl fmt::Display for Dataset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.file_name().trim_end_matches(".json"))
  }
}
