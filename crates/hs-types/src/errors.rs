use thiserror::Error;

/// Main error type for the sweep harness
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors, all detected before the first run starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid range for {field}: {message}")]
    InvalidRange { field: String, message: String },

    #[error("Unknown parameter schema: {name}")]
    UnknownSchema { name: String },

    #[error("Range override for unknown field: {field}")]
    UnknownField { field: String },

    #[error("Duplicate field in schema: {field}")]
    DuplicateField { field: String },

    #[error("Parameter schema {schema} has no fields")]
    EmptySchema { schema: String },

    #[error("Iteration count must be at least 1")]
    NoIterations,

    #[error("Executable command is empty")]
    EmptyCommand,

    #[error("Invalid config file {path}: {message}")]
    InvalidFile { path: String, message: String },

    #[error("Invalid {setting} {name:?}: {message}")]
    InvalidFileName {
        setting: String,
        name: String,
        message: String,
    },
}

/// Errors reading or writing sweep artifacts
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Run output missing: {path}")]
    MissingOutput { path: String },

    #[error("Data parsing error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Write failed for {path}: {message}")]
    WriteFailed { path: String, message: String },
}

/// Structural errors raised while building the consolidated table
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Column mismatch in run {run}: expected [{expected}], found [{found}]")]
    SchemaMismatch {
        run: usize,
        expected: String,
        found: String,
    },

    #[error("Run {run} output already contains reserved column '{column}'")]
    ReservedColumn { run: usize, column: String },

    #[error("None of the {iterations} runs produced output; nothing to aggregate")]
    NoSuccessfulRuns { iterations: usize },
}

/// Result type alias for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AggregationError::SchemaMismatch {
            run: 4,
            expected: "score\tlen".to_string(),
            found: "score".to_string(),
        };

        assert!(error.to_string().contains("run 4"));
        assert!(error.to_string().contains("score\tlen"));

        let error = ConfigError::InvalidFileName {
            setting: "results_file".to_string(),
            name: "test_0.txt".to_string(),
            message: "collides with a per-run output file".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid results_file \"test_0.txt\": collides with a per-run output file"
        );
    }

    #[test]
    fn test_error_conversion() {
        let config_error = ConfigError::UnknownSchema {
            name: "nine".to_string(),
        };
        let sweep_error: SweepError = config_error.into();

        match sweep_error {
            SweepError::Config(ConfigError::UnknownSchema { name }) => assert_eq!(name, "nine"),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn empty_aggregation_names_iteration_count() {
        let error: SweepError = AggregationError::NoSuccessfulRuns { iterations: 12 }.into();
        assert!(error.to_string().contains("12 runs"));
    }
}
