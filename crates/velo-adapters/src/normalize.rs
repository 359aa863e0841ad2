//! Field- and value-level rules shared by all adapters.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, de::DeserializeOwned, de::Error as _};
use serde_json::{Number, Value};
use velo_core::{Error, Result, source::Dataset, station::StationStatus};

use crate::{Normalized, RejectedRecord, UnknownStatusPolicy};

// ─── Document shape ──────────────────────────────────────────────────────────

/// The records of a document published as a top-level JSON array.
pub(crate) fn array_records(dataset: Dataset, document: &Value) -> Result<&[Value]> {
  document
    .as_array()
    .map(Vec::as_slice)
    .ok_or_else(|| Error::SchemaMismatch {
      dataset,
      detail: "expected a top-level array of records".into(),
    })
}

/// The records of a GBFS document, found under `data.stations`.
pub(crate) fn gbfs_records(dataset: Dataset, document: &Value) -> Result<&[Value]> {
  document
    .pointer("/data/stations")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .ok_or_else(|| Error::SchemaMismatch {
      dataset,
      detail: "expected `data.stations` to be an array".into(),
    })
}

/// Decode and map every record independently. A record that fails either
/// step is collected into `rejected` and does not stop the batch.
pub(crate) fn decode_each<R, T>(
  dataset: Dataset,
  records: &[Value],
  code_field: &str,
  mut map: impl FnMut(R) -> Result<T>,
) -> Normalized<T>
where
  R: DeserializeOwned,
{
  let mut out = Normalized::default();
  for (index, record) in records.iter().enumerate() {
    let row = R::deserialize(record)
      .map_err(|e| Error::SchemaMismatch { dataset, detail: e.to_string() })
      .and_then(&mut map);

    match row {
      Ok(row) => out.rows.push(row),
      Err(error) => out.rejected.push(RejectedRecord {
        dataset,
        index,
        code: record.get(code_field).and_then(canonical_code),
        error,
      }),
    }
  }
  out
}

// ─── Codes ───────────────────────────────────────────────────────────────────

/// Render a JSON code as its canonical string: integers without a fraction,
/// strings trimmed. Empty strings and non-scalar values have no code.
pub(crate) fn canonical_code(value: &Value) -> Option<String> {
  let code = match value {
    Value::Number(n) => number_code(n),
    Value::String(s) => s.trim().to_owned(),
    _ => return None,
  };
  (!code.is_empty()).then_some(code)
}

fn number_code(n: &Number) -> String {
  if let Some(i) = n.as_i64() {
    return i.to_string();
  }
  if let Some(u) = n.as_u64() {
    return u.to_string();
  }
  match n.as_f64() {
    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
    _ => n.to_string(),
  }
}

/// A source-local identifier, accepted as a JSON string or number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Code(pub String);

impl<'de> Deserialize<'de> for Code {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    canonical_code(&value)
      .map(Code)
      .ok_or_else(|| D::Error::custom(format!("invalid code {value}")))
  }
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// Drop a leading non-alphabetic tag such as `"00 - "`: keep the text from
/// the first alphabetic character on, or all of it if there is none.
pub(crate) fn strip_name_prefix(name: &str) -> &str {
  match name.char_indices().find(|(_, c)| c.is_alphabetic()) {
    Some((start, _)) => &name[start..],
    None => name,
  }
}

// ─── Coordinates ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct GeoPoint {
  pub lon: Option<f64>,
  pub lat: Option<f64>,
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// An observation time as published: unix seconds, whole or fractional, or
/// an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ObservedAt {
  Epoch(i64),
  /// Sub-second precision is dropped.
  FractionalEpoch(f64),
  Text(String),
}

impl ObservedAt {
  pub fn into_iso(self, dataset: Dataset) -> Result<String> {
    match self {
      Self::Text(text) => Ok(text),
      Self::Epoch(secs) => epoch_to_iso(secs).ok_or_else(|| Error::SchemaMismatch {
        dataset,
        detail: format!("timestamp {secs} out of range"),
      }),
      Self::FractionalEpoch(secs) => secs
        .is_finite()
        .then_some(secs.floor())
        .filter(|secs| (i64::MIN as f64..i64::MAX as f64).contains(secs))
        .and_then(|secs| epoch_to_iso(secs as i64))
        .ok_or_else(|| Error::SchemaMismatch {
          dataset,
          detail: format!("timestamp {secs} out of range"),
        }),
    }
  }
}

/// Unix seconds as `YYYY-MM-DDTHH:MM:SS+00:00`.
pub(crate) fn epoch_to_iso(secs: i64) -> Option<String> {
  DateTime::from_timestamp(secs, 0)
    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string())
}

pub(crate) fn observation_time(
  dataset: Dataset,
  observed: Option<ObservedAt>,
) -> Result<Option<String>> {
  observed.map(|o| o.into_iso(dataset)).transpose()
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// `1`/`0`, `true`/`false` and their string forms.
pub(crate) fn installed_flag(value: &Value) -> Option<StationStatus> {
  match value {
    Value::Bool(true) => Some(StationStatus::Yes),
    Value::Bool(false) => Some(StationStatus::No),
    Value::Number(n) => match n.as_i64() {
      Some(1) => Some(StationStatus::Yes),
      Some(0) => Some(StationStatus::No),
      _ => None,
    },
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "1" | "true" => Some(StationStatus::Yes),
      "0" | "false" => Some(StationStatus::No),
      _ => None,
    },
    _ => None,
  }
}

/// Apply `policy` to a value the source's mapping did not recognise.
pub(crate) fn resolve_status(
  dataset: Dataset,
  field: &'static str,
  value: &Value,
  known: Option<StationStatus>,
  policy: UnknownStatusPolicy,
) -> Result<StationStatus> {
  match (known, policy) {
    (Some(status), _) => Ok(status),
    (None, UnknownStatusPolicy::Assume(status)) => Ok(status),
    (None, UnknownStatusPolicy::Reject) => Err(Error::UnknownEnumValue {
      dataset,
      field,
      value: value.to_string(),
    }),
  }
}
