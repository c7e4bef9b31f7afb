use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use csv::ReaderBuilder;
use hs_types::{DataError, SweepResult};

/// An in-memory tab-separated table: a header row and equally wide data rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All values of a named column, top to bottom. `None` if the column
    /// is unknown or some row is too short to hold it.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str))
            .collect()
    }

    /// Append a column holding `value` on every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.to_string());
        }
        self
    }

    pub(crate) fn extend_rows(&mut self, rows: Vec<Vec<String>>) {
        self.rows.extend(rows);
    }

    pub(crate) fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

/// Reads tab-separated aligner reports back from disk.
#[derive(Debug, Clone)]
pub struct ResultLoader {
    delimiter: u8,
}

impl ResultLoader {
    pub fn new() -> Self {
        Self { delimiter: b'\t' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load one run's output. `Ok(None)` means the run produced no usable
    /// rows: the file is blank or holds only a header line.
    pub fn load_run_output<P: AsRef<Path>>(&self, path: P) -> SweepResult<Option<ResultTable>> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DataError::MissingOutput {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        self.parse(&bytes, path)
    }

    /// Parse tab-separated bytes; `origin` only labels errors.
    pub fn parse(&self, bytes: &[u8], origin: &Path) -> SweepResult<Option<ResultTable>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let parse_error = |message: String| DataError::ParseError {
            path: origin.display().to_string(),
            message,
        };

        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(bytes);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| parse_error(format!("Failed to read header: {}", e)))?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| {
                parse_error(format!("Failed to read record at line {}: {}", line_num + 2, e))
            })?;
            rows.push(record.iter().map(String::from).collect());
        }

        if rows.is_empty() {
            tracing::debug!("Header-only output in {}", origin.display());
            return Ok(None);
        }

        Ok(Some(ResultTable::new(headers, rows)))
    }
}

impl Default for ResultLoader {
    fn default() -> Self {
        Self::new()
    }
}
