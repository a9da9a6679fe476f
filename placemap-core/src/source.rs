//! Row sources: where the rows to plot come from.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Row;

/// One fetch from a row source.
///
/// `loading` means the source has not produced its data yet; callers must
/// not treat the (empty) rows as final.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    pub rows: Vec<Row>,
    pub loading: bool,
}

impl RowBatch {
    pub fn loaded(rows: Vec<Row>) -> Self {
        Self {
            rows,
            loading: false,
        }
    }

    pub fn loading() -> Self {
        Self {
            rows: Vec::new(),
            loading: true,
        }
    }
}

/// Supplies the ordered rows for a map.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch(&self) -> Result<RowBatch>;
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    batch: RowBatch,
}

impl StaticRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            batch: RowBatch::loaded(rows),
        }
    }

    /// A source that is still loading.
    pub fn pending() -> Self {
        Self {
            batch: RowBatch::loading(),
        }
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    async fn fetch(&self) -> Result<RowBatch> {
        Ok(self.batch.clone())
    }
}

/// Rows read from a CSV file (e.g. a spreadsheet export).
///
/// The header row names the columns. Every cell stays a string.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    async fn fetch(&self) -> Result<RowBatch> {
        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&path)?;
            read_csv_rows(file)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

        debug!(path = %self.path.display(), rows = rows.len(), "loaded csv rows");
        Ok(RowBatch::loaded(rows))
    }
}

/// Parse CSV with a header row into rows.
///
/// Short records leave trailing columns absent; cells beyond the header are
/// ignored.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(headers.iter().zip(record.iter()).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_rows() {
        let data = "name,lat,lon\nA,51.1,17.0\nB,0,17.0\n";
        let rows = read_csv_rows(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], Row::from([("name", "A"), ("lat", "51.1"), ("lon", "17.0")]));
        assert_eq!(rows[1].get("lat"), Some("0"));
    }

    #[test]
    fn test_read_csv_rows_ragged() {
        let data = "name,city\nA\nB,Wrocław,extra\n";
        let rows = read_csv_rows(data.as_bytes()).unwrap();

        assert_eq!(rows[0], Row::from([("name", "A")]));
        assert_eq!(rows[1], Row::from([("name", "B"), ("city", "Wrocław")]));
    }

    #[tokio::test]
    async fn test_static_source_pending() {
        let batch = StaticRowSource::pending().fetch().await.unwrap();
        assert!(batch.loading);
        assert!(batch.rows.is_empty());
    }
}
