use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use hs_types::{DataError, HyperparameterSet, SweepResult};

/// Append-only record of every configuration a sweep tried.
///
/// The header is written on creation; each appended row is flushed
/// immediately so the ledger survives an aborted sweep.
#[derive(Debug)]
pub struct RunLedger {
    path: PathBuf,
    writer: Writer<File>,
    field_count: usize,
    rows_written: usize,
}

impl RunLedger {
    /// Create (or truncate) the ledger and write its `run\t<fields...>` header.
    pub fn create<P, I, S>(path: P, field_names: I) -> SweepResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&path)?;
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);

        let mut header = vec!["run".to_string()];
        header.extend(field_names.into_iter().map(|name| name.as_ref().to_string()));
        let field_count = header.len() - 1;

        writer
            .write_record(&header)
            .map_err(|e| write_failed(&path, e))?;
        writer.flush()?;

        tracing::debug!("Run ledger created at {}", path.display());
        Ok(Self {
            path,
            writer,
            field_count,
            rows_written: 0,
        })
    }

    pub fn append(&mut self, run_index: usize, parameters: &HyperparameterSet) -> SweepResult<()> {
        if parameters.len() != self.field_count {
            return Err(DataError::WriteFailed {
                path: self.path.display().to_string(),
                message: format!(
                    "run {} has {} fields, ledger expects {}",
                    run_index,
                    parameters.len(),
                    self.field_count
                ),
            }
            .into());
        }

        let mut record = Vec::with_capacity(self.field_count + 1);
        record.push(run_index.to_string());
        record.extend(parameters.values().map(|v| v.to_string()));

        self.writer
            .write_record(&record)
            .map_err(|e| write_failed(&self.path, e))?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

fn write_failed(path: &Path, err: csv::Error) -> DataError {
    DataError::WriteFailed {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
