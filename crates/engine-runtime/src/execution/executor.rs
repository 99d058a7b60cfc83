use crate::error::RunError;
use connectors::beacon::{BeaconSource, client::BeaconClient};
use engine_config::settings::Settings;
use engine_core::{
    metrics::{Metrics, MetricsSnapshot},
    retry::RetryPolicy,
    state::sled_store::SledStore,
};
use engine_processing::{
    config::DriverConfig,
    context::DriverContext,
    ingest::{IngestReport, Ingestor},
    recheck::{RecheckReport, Rechecker},
    retry::classify_fetch_error,
    state_manager::{BatchTally, StateManager},
    stats::{StatsAggregator, StatsOutcome},
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub head_slot: u64,
    pub resumed_from: u64,
    pub retried: BatchTally,
    pub ingest: IngestReport,
    pub recheck: Option<RecheckReport>,
    pub stats: Option<StatsOutcome>,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// Opens the state store and beacon client named in `settings` and runs
/// one full pass: failed-slot retry, ingestion up to head, validator
/// recheck, stats.
pub async fn run(settings: &Settings, cancel: CancellationToken) -> Result<RunSummary, RunError> {
    std::fs::create_dir_all(&settings.data_dir).map_err(|e| {
        RunError::Initialization(format!(
            "Could not create data dir {}: {e}",
            settings.data_dir.display()
        ))
    })?;

    let store = Arc::new(SledStore::open(&settings.data_dir)?);
    let source = Arc::new(BeaconClient::new(
        &settings.beacon_url,
        settings.request_timeout,
    )?);

    info!(
        beacon = %settings.beacon_url,
        data_dir = %settings.data_dir.display(),
        "Opened state store"
    );

    RunExecutor::new(settings, source, store, cancel)
        .execute()
        .await
}

pub struct RunExecutor {
    ctx: DriverContext,
    store: Arc<SledStore>,
    recheck: bool,
}

impl RunExecutor {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn BeaconSource>,
        store: Arc<SledStore>,
        cancel: CancellationToken,
    ) -> Self {
        let ctx = DriverContext {
            run_id: uuid::Uuid::new_v4().to_string(),
            source,
            store: store.clone(),
            state: store.clone(),
            policy: RetryPolicy::linear(settings.retry_limit, settings.retry_base_delay),
            metrics: Metrics::new(),
            cancel,
            config: DriverConfig::from_settings(settings),
        };

        Self {
            ctx,
            store,
            recheck: settings.recheck,
        }
    }

    /// Replaces the retry policy, e.g. to inject a sleeper.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.ctx.policy = policy;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.ctx.run_id
    }

    pub async fn execute(self) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let state = self.ctx.state_manager();
        info!(run_id = %self.ctx.run_id, "Starting run");

        let head_slot = self
            .ctx
            .policy
            .run(|| self.ctx.source.head_slot(), classify_fetch_error)
            .await
            .map_err(|e| RunError::Head(e.into_inner()))?;

        let ingestor = Ingestor::new(self.ctx.clone());
        let retried = ingestor.retry_failed().await?;
        let resumed_from = ingestor.resume_from().await?;
        state.run_started(head_slot, resumed_from).await?;
        info!(head_slot, resumed_from, "Head slot resolved");

        let mut summary = RunSummary {
            run_id: self.ctx.run_id.clone(),
            head_slot,
            resumed_from,
            retried,
            ingest: IngestReport::default(),
            recheck: None,
            stats: None,
            metrics: MetricsSnapshot::default(),
            elapsed: Duration::ZERO,
            interrupted: false,
        };

        summary.ingest = ingestor.ingest(resumed_from, head_slot).await?;
        if summary.ingest.interrupted || self.ctx.cancel.is_cancelled() {
            return self.finish_interrupted(&state, summary, started).await;
        }

        if self.recheck {
            let rechecker = Rechecker::new(self.ctx.clone());
            let known = rechecker.known_validators().await?;
            let report = rechecker.recheck_all(known).await;
            state.recheck_done(report.refreshed, report.failed).await?;

            let interrupted = report.interrupted;
            summary.recheck = Some(report);
            if interrupted {
                return self.finish_interrupted(&state, summary, started).await;
            }
        }

        let outcome = StatsAggregator::new(self.ctx.clone())
            .compute_stats(head_slot)
            .await?;
        match &outcome {
            StatsOutcome::Computed(_) => state.stats_computed(head_slot).await?,
            StatsOutcome::AlreadyComputed | StatsOutcome::Deferred { .. } => {}
            StatsOutcome::Interrupted => {
                summary.stats = Some(outcome);
                return self.finish_interrupted(&state, summary, started).await;
            }
        }
        summary.stats = Some(outcome);

        state.run_done().await?;
        self.store.flush().await?;

        summary.metrics = self.ctx.metrics.snapshot();
        summary.elapsed = started.elapsed();
        info!(
            run_id = %summary.run_id,
            head_slot,
            persisted = summary.metrics.records_persisted,
            skipped = summary.metrics.records_skipped,
            failures = summary.metrics.failure_count,
            retries = summary.metrics.retry_count,
            batches = summary.metrics.batches_committed,
            elapsed_secs = summary.elapsed.as_secs(),
            "Run completed"
        );
        Ok(summary)
    }

    async fn finish_interrupted(
        &self,
        state: &StateManager,
        mut summary: RunSummary,
        started: Instant,
    ) -> Result<RunSummary, RunError> {
        state.interrupted().await?;
        self.store.flush().await?;

        summary.interrupted = true;
        summary.metrics = self.ctx.metrics.snapshot();
        summary.elapsed = started.elapsed();
        warn!(
            run_id = %summary.run_id,
            last_committed = ?summary.ingest.last_committed,
            "Run interrupted, progress up to the last committed batch is saved"
        );
        Ok(summary)
    }
}
