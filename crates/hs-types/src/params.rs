use serde::{Deserialize, Serialize};
use std::fmt;

/// One sampled hyperparameter: field name, CLI flag and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    pub flag: String,
    pub value: f64,
}

impl ParameterEntry {
    pub fn new(name: impl Into<String>, flag: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            flag: flag.into(),
            value,
        }
    }
}

impl fmt::Display for ParameterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// An immutable, ordered set of hyperparameter values.
///
/// Entry order is the schema order; it drives both the ledger column order
/// and the order flags are passed to the aligner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSet {
    entries: Vec<ParameterEntry>,
}

impl HyperparameterSet {
    pub fn new(entries: Vec<ParameterEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|entry| entry.value)
    }

    /// Render as `--<flag> <value>` pairs, flag and value as separate arguments.
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len() * 2);
        for entry in &self.entries {
            args.push(format!("--{}", entry.flag));
            args.push(entry.value.to_string());
        }
        args
    }
}

impl fmt::Display for HyperparameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
