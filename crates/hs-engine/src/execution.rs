use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use hs_optimizer::{Run, StderrMode, SweepConfig};
use hs_types::{ConfigError, SweepResult};
use tokio::process::Command;
use tracing::{debug, warn};

/// What a finished invocation left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    /// `None` if the process never started or was killed by a signal.
    pub exit_code: Option<i32>,
    pub output_bytes: u64,
}

/// Executes one run, writing its report to `output_path`.
///
/// Implementations must leave a file at `output_path` (empty on failure)
/// and only return `Err` for problems that should abort the whole sweep.
#[async_trait]
pub trait RunExecutor: Send + Sync {
    async fn execute(&self, run: &Run, output_path: &Path) -> SweepResult<ExecutionReport>;

    fn name(&self) -> &str;
}

/// Runs the external aligner as a subprocess, one blocking call per run.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: String,
    leading_args: Vec<String>,
    input: PathBuf,
    stderr: StderrMode,
}

impl ProcessInvoker {
    pub fn new(
        command: &[String],
        input: impl Into<PathBuf>,
        stderr: StderrMode,
    ) -> Result<Self, ConfigError> {
        let (program, leading_args) = command.split_first().ok_or(ConfigError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
            input: input.into(),
            stderr,
        })
    }

    pub fn from_config(config: &SweepConfig) -> Result<Self, ConfigError> {
        Self::new(&config.command, config.input.clone(), config.stderr)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program: leading args, the input path, then one
    /// `--<flag> <value>` pair per field.
    pub fn arguments(&self, run: &Run) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.push(self.input.clone().into_os_string());
        args.extend(run.parameters.to_cli_args().into_iter().map(OsString::from));
        args
    }

    fn stderr_sink(&self) -> Stdio {
        match self.stderr {
            StderrMode::Discard => Stdio::null(),
            StderrMode::Inherit => Stdio::inherit(),
        }
    }
}

#[async_trait]
impl RunExecutor for ProcessInvoker {
    async fn execute(&self, run: &Run, output_path: &Path) -> SweepResult<ExecutionReport> {
        let stdout = File::create(output_path)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(self.arguments(run))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(self.stderr_sink())
            .kill_on_drop(true);

        let exit_code = match cmd.status().await {
            Ok(status) => {
                if !status.success() {
                    debug!(run = run.index, status = %status, "Aligner exited unsuccessfully");
                }
                status.code()
            }
            Err(e) => {
                warn!(
                    run = run.index,
                    program = %self.program,
                    error = %e,
                    "Failed to launch aligner"
                );
                None
            }
        };

        let output_bytes = tokio::fs::metadata(output_path).await?.len();
        Ok(ExecutionReport {
            exit_code,
            output_bytes,
        })
    }

    fn name(&self) -> &str {
        "process"
    }
}
