use hs_types::{AggregationError, SweepResult};

use crate::loaders::{ResultLoader, ResultTable};
use crate::storage::RunOutputStore;

/// Column appended to every aggregated row, holding the run index.
pub const ITERATION_COLUMN: &str = "iteration";

/// Accumulates per-run tables into the consolidated table.
///
/// Runs must be pushed in index order. The first non-empty table fixes
/// the column set; every later one has to match it exactly.
#[derive(Debug, Default)]
pub struct Aggregator {
    combined: Option<ResultTable>,
    aggregated_runs: Vec<usize>,
    skipped_runs: Vec<usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one run's table. Returns `Ok(false)` if the run had nothing to add.
    pub fn push(&mut self, run: usize, table: Option<ResultTable>) -> SweepResult<bool> {
        let table = match table {
            Some(table) if !table.is_empty() => table,
            _ => {
                self.skipped_runs.push(run);
                return Ok(false);
            }
        };

        if table.column_index(ITERATION_COLUMN).is_some() {
            return Err(AggregationError::ReservedColumn {
                run,
                column: ITERATION_COLUMN.to_string(),
            }
            .into());
        }

        let tagged = table.with_constant_column(ITERATION_COLUMN, &run.to_string());
        let combined = match self.combined.take() {
            None => tagged,
            Some(mut combined) => {
                if combined.headers() != tagged.headers() {
                    let err = AggregationError::SchemaMismatch {
                        run,
                        expected: combined.headers().join("\t"),
                        found: tagged.headers().join("\t"),
                    };
                    self.combined = Some(combined);
                    return Err(err.into());
                }
                combined.extend_rows(tagged.into_rows());
                combined
            }
        };
        self.combined = Some(combined);
        self.aggregated_runs.push(run);
        Ok(true)
    }

    pub fn aggregated_runs(&self) -> &[usize] {
        &self.aggregated_runs
    }

    pub fn skipped_runs(&self) -> &[usize] {
        &self.skipped_runs
    }

    /// Consume the aggregator. Fails if no run contributed any rows.
    pub fn finish(self, iterations: usize) -> SweepResult<ResultTable> {
        self.combined
            .ok_or_else(|| AggregationError::NoSuccessfulRuns { iterations }.into())
    }

    /// Read `test_<i>.txt` for every `i` in `0..iterations` and combine them.
    pub fn collect(
        loader: &ResultLoader,
        store: &RunOutputStore,
        iterations: usize,
    ) -> SweepResult<ResultTable> {
        let mut aggregator = Self::new();
        for run in 0..iterations {
            let table = loader.load_run_output(store.output_path(run))?;
            aggregator.push(run, table)?;
        }
        aggregator.finish(iterations)
    }
}
