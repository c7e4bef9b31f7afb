//! Sweep configuration: serde-backed with defaults, builder overrides and
//! startup validation.

use hs_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::search::{ParameterSchema, RangeSpec, SchemaKind};

const SUMMARY_FILE: &str = "sweep_summary.json";

/// What happens to the aligner's standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrMode {
    /// Send to a null sink.
    #[default]
    Discard,
    /// Share the harness's own stderr.
    Inherit,
}

/// Top-level configuration for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Program followed by its leading arguments; the input path and the
    /// parameter flags are appended per run.
    pub command: Vec<String>,

    /// Dataset passed as the first positional argument after `command`.
    pub input: PathBuf,

    /// Directory holding per-run files, the ledger and the consolidated table.
    pub output_dir: PathBuf,

    /// Number of runs (N).
    pub iterations: usize,

    pub seed: u64,

    pub schema: SchemaKind,

    /// Per-field replacements for the preset ranges.
    pub range_overrides: BTreeMap<String, RangeSpec>,

    pub stderr: StderrMode,

    pub ledger_file: String,

    pub results_file: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            command: ["cargo", "run", "--release", "-q", "--"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            input: PathBuf::from("test/SVA_ref_core.fa"),
            output_dir: PathBuf::from("test/hyper_param_test"),
            iterations: 1000,
            seed: 100,
            schema: SchemaKind::Eight,
            range_overrides: BTreeMap::new(),
            stderr: StderrMode::Discard,
            ledger_file: "hyperparam_table.txt".to_string(),
            results_file: "total_results.txt".to_string(),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let invalid = |message: String| ConfigError::InvalidFile {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_schema(mut self, schema: SchemaKind) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_range_override(mut self, field: impl Into<String>, spec: RangeSpec) -> Self {
        self.range_overrides.insert(field.into(), spec);
        self
    }

    pub fn with_stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    pub fn with_ledger_file(mut self, name: impl Into<String>) -> Self {
        self.ledger_file = name.into();
        self
    }

    pub fn with_results_file(mut self, name: impl Into<String>) -> Self {
        self.results_file = name.into();
        self
    }

    /// Check everything that can be checked without running anything and
    /// return the resolved parameter schema.
    pub fn validate(&self) -> Result<ParameterSchema, ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.command.iter().all(|part| part.trim().is_empty()) {
            return Err(ConfigError::EmptyCommand);
        }
        self.validate_file_names()?;
        self.build_schema()
    }

    /// The ledger and the consolidated table share `output_dir` with the
    /// per-run files, which cleanup deletes. Each needs a distinct plain
    /// file name outside that pattern.
    fn validate_file_names(&self) -> Result<(), ConfigError> {
        let named = [
            ("ledger_file", &self.ledger_file),
            ("results_file", &self.results_file),
        ];
        for (setting, name) in named {
            let invalid = |message: &str| ConfigError::InvalidFileName {
                setting: setting.to_string(),
                name: name.clone(),
                message: message.to_string(),
            };
            if name.trim().is_empty() {
                return Err(invalid("file name is empty"));
            }
            if Path::new(name).file_name() != Some(OsStr::new(name)) {
                return Err(invalid("must be a plain file name inside output_dir"));
            }
            if is_run_output_name(name) {
                return Err(invalid("collides with a per-run output file"));
            }
            if name == SUMMARY_FILE {
                return Err(invalid("collides with the sweep summary"));
            }
        }
        if self.ledger_file == self.results_file {
            return Err(ConfigError::InvalidFileName {
                setting: "results_file".to_string(),
                name: self.results_file.clone(),
                message: "same file as ledger_file".to_string(),
            });
        }
        Ok(())
    }

    pub fn build_schema(&self) -> Result<ParameterSchema, ConfigError> {
        ParameterSchema::preset(self.schema).with_overrides(&self.range_overrides)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(&self.ledger_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.results_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }
}

/// `test_<index>.txt`, the name cleanup removes.
fn is_run_output_name(name: &str) -> bool {
    name.strip_prefix("test_")
        .and_then(|rest| rest.strip_suffix(".txt"))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}
