use std::fs;

use hs_data::{write_table_atomic, Aggregator, ResultLoader, ResultTable, RunLedger, RunOutputStore};
use hs_optimizer::{
    seeded_rng, ParameterSchema, RandomSampler, Run, RunStatus, SweepConfig, SweepStatus,
};
use hs_types::SweepResult;
use tracing::{debug, info, warn};

use crate::execution::{ProcessInvoker, RunExecutor};

/// Drives one sweep: sample, record, invoke, aggregate, clean up.
pub struct SweepEngine {
    config: SweepConfig,
    schema: ParameterSchema,
    executor: Box<dyn RunExecutor>,
    loader: ResultLoader,
}

impl SweepEngine {
    /// Validate `config` and build an engine around `executor`.
    pub fn new(config: SweepConfig, executor: Box<dyn RunExecutor>) -> SweepResult<Self> {
        let schema = config.validate()?;
        if !config.input.exists() {
            warn!(
                "Input dataset {} does not exist; runs will likely fail",
                config.input.display()
            );
        }
        Ok(Self {
            config,
            schema,
            executor,
            loader: ResultLoader::new(),
        })
    }

    /// Engine that invokes the configured aligner command as a subprocess.
    pub fn with_process(config: SweepConfig) -> SweepResult<Self> {
        let invoker = ProcessInvoker::from_config(&config)?;
        Self::new(config, Box::new(invoker))
    }

    /// Use an explicit schema descriptor instead of the configured preset.
    pub fn with_schema(mut self, schema: ParameterSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Run the whole sweep. The summary file is written whether or not the
    /// sweep succeeds; the consolidated table only on success.
    pub async fn run(&self) -> SweepResult<SweepStatus> {
        let store = RunOutputStore::new(&self.config.output_dir)?;
        let mut status = SweepStatus::new(
            &self.schema.name,
            self.config.seed,
            self.config.iterations,
            self.config.ledger_path(),
        );
        status.mark_running();

        info!(
            schema = %self.schema.name,
            fields = self.schema.len(),
            iterations = self.config.iterations,
            seed = self.config.seed,
            executor = self.executor.name(),
            "Starting sweep {}",
            status.id
        );
        if let Some(size) = self.schema.space_size() {
            debug!("Parameter space holds {} configurations", size);
        }

        let outcome = self.execute(&store, &mut status).await;
        match &outcome {
            Ok(()) => status.mark_completed(),
            Err(e) => status.mark_failed(e.to_string()),
        }

        if let Err(e) = self.write_summary(&status) {
            warn!("Failed to write sweep summary: {}", e);
        }

        outcome.map(|()| status)
    }

    async fn execute(&self, store: &RunOutputStore, status: &mut SweepStatus) -> SweepResult<()> {
        let mut runs = self.invoke_all(store, status).await?;

        let table = self.aggregate(store, &mut runs, status)?;
        let results_path = self.config.results_path();
        write_table_atomic(&results_path, &table)?;
        status.results_path = Some(results_path);

        status.files_removed = store.cleanup(self.config.iterations)?;
        info!(
            succeeded = status.runs_succeeded,
            failed = status.runs_failed,
            rows = status.rows_aggregated,
            "Sweep complete"
        );
        Ok(())
    }

    async fn invoke_all(
        &self,
        store: &RunOutputStore,
        status: &mut SweepStatus,
    ) -> SweepResult<Vec<Run>> {
        let iterations = self.config.iterations;
        let sampler = RandomSampler::new(self.schema.clone());
        let mut rng = seeded_rng(self.config.seed);
        let mut ledger = RunLedger::create(self.config.ledger_path(), self.schema.field_names())?;

        let progress_every = (iterations / 10).max(1);
        let mut runs = Vec::with_capacity(iterations);

        for index in 0..iterations {
            let mut run = Run::new(index, sampler.sample(&mut rng));
            ledger.append(index, &run.parameters)?;

            run.mark_invoked();
            debug!(run = index, parameters = %run.parameters, "Invoking aligner");
            let report = self
                .executor
                .execute(&run, &store.output_path(index))
                .await?;
            run.mark_finished(report.exit_code, report.output_bytes);

            match run.status {
                RunStatus::Failed => {
                    warn!(run = index, exit_code = ?report.exit_code, "Run produced no output")
                }
                RunStatus::Succeeded if report.exit_code != Some(0) => warn!(
                    run = index,
                    exit_code = ?report.exit_code,
                    "Aligner exited unsuccessfully but wrote output; keeping it"
                ),
                _ => {}
            }
            status.record_run(&run);

            if (index + 1) % progress_every == 0 || index + 1 == iterations {
                info!(
                    "{}/{} runs complete ({} without output)",
                    index + 1,
                    iterations,
                    status.runs_failed
                );
            }
            runs.push(run);
        }

        Ok(runs)
    }

    fn aggregate(
        &self,
        store: &RunOutputStore,
        runs: &mut [Run],
        status: &mut SweepStatus,
    ) -> SweepResult<ResultTable> {
        let mut aggregator = Aggregator::new();
        for run in runs.iter_mut() {
            let table = self.loader.load_run_output(store.output_path(run.index))?;
            if aggregator.push(run.index, table)? {
                run.mark_aggregated();
            } else {
                if run.succeeded() {
                    status.runs_skipped += 1;
                }
                run.mark_skipped();
            }
        }

        let table = aggregator.finish(self.config.iterations)?;
        status.rows_aggregated = table.num_rows();
        Ok(table)
    }

    fn write_summary(&self, status: &SweepStatus) -> SweepResult<()> {
        let json = serde_json::to_string_pretty(status)?;
        fs::write(self.config.summary_path(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionReport;
    use async_trait::async_trait;
    use hs_optimizer::{FieldSpec, RangeSpec, SchemaKind, SweepState};
    use hs_types::{AggregationError, ConfigError, SweepError};
    use std::path::Path;

    /// Writes canned output per run index instead of spawning a process.
    struct ScriptedExecutor {
        outputs: Vec<&'static str>,
    }

    #[async_trait]
    impl RunExecutor for ScriptedExecutor {
        async fn execute(&self, run: &Run, output_path: &Path) -> SweepResult<ExecutionReport> {
            let body = self.outputs.get(run.index).copied().unwrap_or("");
            tokio::fs::write(output_path, body).await?;
            Ok(ExecutionReport {
                exit_code: Some(0),
                output_bytes: body.len() as u64,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn config_in(dir: &Path, iterations: usize) -> SweepConfig {
        SweepConfig::new()
            .with_output_dir(dir)
            .with_input(dir.join("ref.fa"))
            .with_iterations(iterations)
    }

    fn engine(dir: &Path, outputs: Vec<&'static str>) -> SweepEngine {
        SweepEngine::new(
            config_in(dir, outputs.len()),
            Box::new(ScriptedExecutor { outputs }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sweep_writes_table_ledger_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(
            dir.path(),
            vec!["name\tscore\nA\t1\n", "", "name\tscore\nB\t2\nC\t3\n", "name\tscore\n"],
        );

        let status = engine.run().await.unwrap();
        assert_eq!(status.state, SweepState::Completed);
        assert_eq!(status.runs_succeeded, 3);
        assert_eq!(status.runs_failed, 1);
        assert_eq!(status.runs_skipped, 1);
        assert_eq!(status.rows_aggregated, 3);
        assert_eq!(status.files_removed, 4);

        let loader = ResultLoader::new();
        let results = loader
            .load_run_output(engine.config().results_path())
            .unwrap()
            .unwrap();
        assert_eq!(results.column("iteration").unwrap(), vec!["0", "2", "2"]);

        let ledger = loader
            .load_run_output(engine.config().ledger_path())
            .unwrap()
            .unwrap();
        assert_eq!(ledger.num_rows(), 4);
        assert_eq!(ledger.headers().len(), 9);

        assert!(engine.config().summary_path().exists());
    }

    #[tokio::test]
    async fn all_empty_runs_fail_without_a_table() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), vec!["", "", ""]);

        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err,
            SweepError::Aggregation(AggregationError::NoSuccessfulRuns { iterations: 3 })
        ));
        assert!(!engine.config().results_path().exists());

        // Ledger is complete and per-run files are left for inspection.
        let ledger = ResultLoader::new()
            .load_run_output(engine.config().ledger_path())
            .unwrap()
            .unwrap();
        assert_eq!(ledger.column("run").unwrap(), vec!["0", "1", "2"]);
        assert!(dir.path().join("test_0.txt").exists());

        let summary: SweepStatus = serde_json::from_str(
            &std::fs::read_to_string(engine.config().summary_path()).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.state, SweepState::Failed);
        assert!(summary.error.unwrap().contains("nothing to aggregate"));
    }

    #[tokio::test]
    async fn column_change_mid_sweep_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), vec!["score\n1\n", "score\tlength\n2\t300\n"]);

        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err,
            SweepError::Aggregation(AggregationError::SchemaMismatch { run: 1, .. })
        ));
        assert!(!engine.config().results_path().exists());
    }

    #[tokio::test]
    async fn same_seed_gives_same_ledger() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let outputs = vec!["score\n1\n"; 20];

        let a = engine(first.path(), outputs.clone());
        let b = engine(second.path(), outputs);
        a.run().await.unwrap();
        b.run().await.unwrap();

        let ledger_a = std::fs::read_to_string(a.config().ledger_path()).unwrap();
        let ledger_b = std::fs::read_to_string(b.config().ledger_path()).unwrap();
        assert_eq!(ledger_a, ledger_b);
    }

    #[test]
    fn custom_schema_replaces_preset() {
        let dir = tempfile::tempdir().unwrap();
        let schema = ParameterSchema::new(
            "single",
            vec![FieldSpec::new("loop_prob", RangeSpec::new(0.1, 0.2, 2)).unwrap()],
        )
        .unwrap();
        let engine = engine(dir.path(), vec![""]).with_schema(schema);
        assert_eq!(engine.schema().len(), 1);
        assert_eq!(engine.config().schema, SchemaKind::Eight);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let result = SweepEngine::new(
            config_in(dir.path(), 0),
            Box::new(ScriptedExecutor { outputs: vec![] }),
        );
        assert!(matches!(result, Err(SweepError::Config(_))));

        let result = SweepEngine::new(
            config_in(dir.path(), 2).with_results_file("test_0.txt"),
            Box::new(ScriptedExecutor { outputs: vec![] }),
        );
        assert!(matches!(
            result,
            Err(SweepError::Config(ConfigError::InvalidFileName { .. }))
        ));
    }
}
