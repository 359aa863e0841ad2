//! [`DirectoryProvider`], raw snapshots read back from the fetcher's layout.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::NaiveDate;
use velo_core::{Error, Result, provider::SnapshotProvider, source::Dataset};

/// Reads `<root>/<YYYY-MM-DD>/<dataset file>`.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
  root: PathBuf,
}

impl DirectoryProvider {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Where the fetcher saves `dataset` for `date`.
  pub fn path_for(&self, dataset: Dataset, date: NaiveDate) -> PathBuf {
    self
      .root
      .join(date.format("%Y-%m-%d").to_string())
      .join(dataset.file_name())
  }
}

impl SnapshotProvider for DirectoryProvider {
  async fn read(&self, dataset: Dataset, date: NaiveDate) -> Result<Vec<u8>> {
    let path = self.path_for(dataset, date);
    tracing::debug!(path = %path.display(), "reading raw snapshot");

    tokio::fs::read(&path).await.map_err(|source| {
      if source.kind() == ErrorKind::NotFound {
        Error::MissingInput { dataset, date }
      } else {
        Error::Io { dataset, date, source }
      }
    })
  }
}
