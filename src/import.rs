use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const PREVIEW_ROWS: usize = 5;
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "description", "amount", "type"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{} is not a .csv file", .0.display())]
    NotCsv(PathBuf),
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Header and leading rows of a CSV file, checked before upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub missing_columns: Vec<&'static str>,
}

impl CsvPreview {
    pub fn is_uploadable(&self) -> bool {
        self.missing_columns.is_empty()
    }
}

pub fn ensure_csv_extension(path: &Path) -> Result<(), ImportError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(())
    } else {
        Err(ImportError::NotCsv(path.to_path_buf()))
    }
}

pub fn preview_file(path: &Path) -> Result<CsvPreview, ImportError> {
    ensure_csv_extension(path)?;
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    preview(file)
}

pub fn preview<R: Read>(input: R) -> Result<CsvPreview, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::with_capacity(PREVIEW_ROWS);
    for record in reader.records().take(PREVIEW_ROWS) {
        let record = record?;
        let row = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    let missing_columns = missing_columns(&headers);
    if !missing_columns.is_empty() {
        tracing::debug!(?missing_columns, "csv is missing required columns");
    }

    Ok(CsvPreview {
        headers,
        rows,
        missing_columns,
    })
}

fn missing_columns(headers: &[String]) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .into_iter()
        .filter(|req| !headers.iter().any(|h| h.eq_ignore_ascii_case(req)))
        .collect()
}
