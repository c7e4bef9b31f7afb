use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use hs_types::{DataError, SweepResult};

use crate::loaders::ResultTable;

/// Owns the sweep output directory and the per-run file naming.
#[derive(Debug, Clone)]
pub struct RunOutputStore {
    root: PathBuf,
}

impl RunOutputStore {
    pub fn new<P: AsRef<Path>>(root: P) -> SweepResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where run `index` writes its stdout.
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("test_{}.txt", index))
    }

    /// Remove the per-run files of runs `0..iterations`. Files already gone
    /// are ignored, so calling this twice is harmless.
    pub fn cleanup(&self, iterations: usize) -> SweepResult<usize> {
        let mut removed = 0;
        for index in 0..iterations {
            match fs::remove_file(self.output_path(index)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!("Removed {} run output files from {}", removed, self.root.display());
        Ok(removed)
    }
}

/// Write `table` as TSV to `path` via a temporary sibling and a rename, so
/// readers never observe a half-written table.
pub fn write_table_atomic<P: AsRef<Path>>(path: P, table: &ResultTable) -> SweepResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_sibling(path);

    if let Err(e) = write_table(&tmp_path, table) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path)?;

    tracing::info!("Wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

fn write_table(path: &Path, table: &ResultTable) -> SweepResult<()> {
    let write_failed = |e: csv::Error| DataError::WriteFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
    writer.write_record(table.headers()).map_err(write_failed)?;
    for row in table.rows() {
        writer.write_record(row).map_err(write_failed)?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| DataError::WriteFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    file.sync_all()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
