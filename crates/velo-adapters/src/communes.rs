//! The national municipality registry (`geo.api.gouv.fr/communes`).

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use velo_core::{Result, city::StagedCity, source::Dataset};

use crate::{
  Normalized,
  normalize::{Code, array_records, decode_each},
};

const DATASET: Dataset = Dataset::Communes;

#[derive(Deserialize)]
struct CommuneRecord {
  code:       Code,
  nom:        String,
  population: Option<i64>,
}

/// Stage the registry as `{id, name, nb_inhabitants}` rows.
///
/// Exact duplicate triples are dropped, keeping the first occurrence. Entries
/// that share a code but differ in name or population are all kept.
pub fn normalize_cities(
  document: &Value,
  run_date: NaiveDate,
) -> Result<Normalized<StagedCity>> {
  let records = array_records(DATASET, document)?;

  let mut out = decode_each(DATASET, records, "code", |r: CommuneRecord| {
    Ok(StagedCity {
      id:             r.code.0,
      name:           r.nom,
      nb_inhabitants: r.population,
      created_date:   run_date,
    })
  });

  let mut seen = HashSet::new();
  out.rows.retain(|city| {
    seen.insert((city.id.clone(), city.name.clone(), city.nb_inhabitants))
  });

  Ok(out)
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use velo_core::Error;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() }

  #[test]
  fn registry_fields_are_renamed() {
    let doc = json!([{
      "nom": "Toulouse",
      "code": "31555",
      "codesPostaux": ["31000", "31100"],
      "population": 504078
    }]);
    let out = normalize_cities(&doc, date()).unwrap();
    assert_eq!(out.rows, vec![StagedCity {
      id:             "31555".into(),
      name:           "Toulouse".into(),
      nb_inhabitants: Some(504_078),
      created_date:   date(),
    }]);
  }

  #[test]
  fn exact_duplicates_collapse_but_same_code_variants_survive() {
    let doc = json!([
      { "nom": "Nantes", "code": "44109", "population": 320732 },
      { "nom": "Nantes", "code": "44109", "population": 320732 },
      { "nom": "Nantes", "code": "44109", "population": 323204 },
      { "nom": "Arrondissement", "code": "75101" }
    ]);
    let out = normalize_cities(&doc, date()).unwrap();
    assert_eq!(out.rows.len(), 3);
    assert_eq!(out.rows[2].nb_inhabitants, None);
  }

  #[test]
  fn entry_without_name_is_rejected() {
    let doc = json!([
      { "code": "01001", "population": 779 },
      { "nom": "Montpellier", "code": "34172", "population": 299096 }
    ]);
    let out = normalize_cities(&doc, date()).unwrap();
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rejected[0].code.as_deref(), Some("01001"));
    assert!(matches!(out.rejected[0].error, Error::SchemaMismatch { .. }));
  }
}
