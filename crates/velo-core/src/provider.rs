//! The raw snapshot provider consumed by the pipeline.
//!
//! Fetching the open-data APIs and saving their bodies is done by a separate
//! collaborator. The pipeline only needs read access to what it saved,
//! addressed by dataset and day.

use std::future::Future;

use chrono::NaiveDate;

use crate::{Result, source::Dataset};

pub trait SnapshotProvider: Send + Sync {
  /// Return the raw bytes of `dataset` as saved for `date`.
  ///
  /// Fails with [`crate::Error::MissingInput`] when the document was never
  /// written for that day.
  fn read(
    &self,
    dataset: Dataset,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<u8>>> + Send + '_;
}
