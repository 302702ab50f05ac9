use crate::Result;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Append-only CSV file
///
/// The file is opened in append mode for every row, so rows written before a
/// restart are kept. The header goes in only when the file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    header: &'static [&'static str],
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file has no content
    pub fn append<T: Serialize>(&self, row: &T) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            wtr.write_record(self.header)?;
            tracing::debug!(path = %self.path.display(), "Created csv log");
        }

        wtr.serialize(row)?;
        wtr.flush()?;
        Ok(())
    }
}
