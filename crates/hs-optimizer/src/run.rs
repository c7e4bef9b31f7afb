//! Run tracking and sweep status.

use chrono::{DateTime, Utc};
use hs_types::HyperparameterSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique sweep identifier.
pub type SweepId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Invoked,
    /// The aligner wrote something to stdout.
    Succeeded,
    /// Stdout stayed empty.
    Failed,
    Aggregated,
    Skipped,
}

/// One sweep iteration: an index and the configuration sampled for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub index: usize,
    pub parameters: HyperparameterSet,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    pub output_bytes: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(index: usize, parameters: HyperparameterSet) -> Self {
        Self {
            index,
            parameters,
            status: RunStatus::Pending,
            exit_code: None,
            output_bytes: 0,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_invoked(&mut self) {
        self.status = RunStatus::Invoked;
        self.started_at = Some(Utc::now());
    }

    /// Settle the run from what the process left behind. The exit code is
    /// kept for diagnostics only; empty output alone means failure.
    pub fn mark_finished(&mut self, exit_code: Option<i32>, output_bytes: u64) {
        self.exit_code = exit_code;
        self.output_bytes = output_bytes;
        self.finished_at = Some(Utc::now());
        self.status = if output_bytes == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
    }

    pub fn mark_aggregated(&mut self) {
        self.status = RunStatus::Aggregated;
    }

    pub fn mark_skipped(&mut self) {
        self.status = RunStatus::Skipped;
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded | RunStatus::Aggregated)
    }
}

/// Lifecycle state for a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of a sweep, persisted as the sweep summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepStatus {
    pub id: SweepId,
    pub state: SweepState,
    pub schema: String,
    pub seed: u64,
    pub iterations: usize,
    pub runs_succeeded: usize,
    pub runs_failed: usize,
    /// Runs with output that held no data rows.
    pub runs_skipped: usize,
    pub rows_aggregated: usize,
    pub files_removed: usize,
    pub ledger_path: PathBuf,
    pub results_path: Option<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SweepStatus {
    pub fn new(schema: &str, seed: u64, iterations: usize, ledger_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SweepState::Pending,
            schema: schema.to_string(),
            seed,
            iterations,
            runs_succeeded: 0,
            runs_failed: 0,
            runs_skipped: 0,
            rows_aggregated: 0,
            files_removed: 0,
            ledger_path,
            results_path: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = SweepState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = SweepState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SweepState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn record_run(&mut self, run: &Run) {
        if run.succeeded() {
            self.runs_succeeded += 1;
        } else {
            self.runs_failed += 1;
        }
    }

    pub fn runs_completed(&self) -> usize {
        self.runs_succeeded + self.runs_failed
    }
}
