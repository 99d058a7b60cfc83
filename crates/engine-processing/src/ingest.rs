use crate::{
    context::DriverContext,
    error::IngestError,
    fetch::fetch_with_retry,
    ledger::FailedSlots,
    pool::{PoolReport, WorkResult, WorkerPool},
    state_manager::{BatchTally, StateManager},
};
use connectors::beacon::BeaconSource;
use engine_core::{
    metrics::Metrics,
    progress::ProgressReporter,
    retry::RetryPolicy,
    state::{BLOCKS, Datastore, id_key},
};
use model::pagination::range::SlotRange;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub range: Option<SlotRange>,
    pub tally: BatchTally,
    pub batches_committed: u64,
    pub last_committed: Option<u64>,
    pub interrupted: bool,
}

/// Batch ingestion driver. Batches run one after another; slots within a
/// batch run on the worker pool. The checkpoint moves to a batch's last slot
/// only once every slot of that batch was processed.
pub struct Ingestor {
    ctx: DriverContext,
    state: StateManager,
    ledger: FailedSlots,
    pool: WorkerPool,
}

impl Ingestor {
    pub fn new(ctx: DriverContext) -> Self {
        Self {
            state: ctx.state_manager(),
            ledger: FailedSlots::new(ctx.store.clone()),
            pool: WorkerPool::new(ctx.config.concurrency_limit),
            ctx,
        }
    }

    pub async fn resume_from(&self) -> Result<u64, IngestError> {
        Ok(self.state.resume_from(self.ctx.config.start_slot).await?)
    }

    /// Ingests `start..=end`. An empty range (`start > end`) is a no-op.
    pub async fn ingest(&self, start: u64, end: u64) -> Result<IngestReport, IngestError> {
        let Some(range) = SlotRange::new(start, end) else {
            info!(start, end, "Nothing to ingest");
            return Ok(IngestReport::default());
        };

        let batch_size = self.ctx.config.batch_size.max(1);
        info!(
            range = %range,
            slots = range.len(),
            batch_size,
            concurrency = self.pool.limit(),
            "Starting ingestion"
        );

        let progress = ProgressReporter::new("ingest", range.len(), batch_size);
        let mut report = IngestReport {
            range: Some(range),
            ..Default::default()
        };

        for batch in range.batches(batch_size) {
            if self.ctx.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let pool_report = self.run_slots(batch.ids().collect()).await;
            let tally = tally(&pool_report);
            report.tally.add(tally);
            // A failed slot must reach the ledger before the checkpoint can pass it.
            self.record_failures(&pool_report).await?;

            if !pool_report.is_complete() {
                warn!(
                    batch = %batch,
                    processed = pool_report.processed(),
                    total = pool_report.total,
                    "Batch interrupted, checkpoint not advanced"
                );
                report.interrupted = true;
                break;
            }

            self.state.commit_batch(batch, tally).await?;
            self.ctx.metrics.increment_batches(1);
            report.batches_committed += 1;
            report.last_committed = Some(batch.end);

            info!(
                batch_start = batch.start,
                batch_end = batch.end,
                succeeded = tally.succeeded,
                skipped = tally.skipped,
                failed = tally.failed,
                "Batch committed"
            );
            progress.advance(batch.len());
            progress.report();
        }

        progress.finish();
        Ok(report)
    }

    /// Re-drives every slot in the failed-slot ledger. Slots that now succeed
    /// or turn out to be missed are removed from the ledger.
    pub async fn retry_failed(&self) -> Result<BatchTally, IngestError> {
        let slots = self.ledger.slots().await?;
        if slots.is_empty() {
            return Ok(BatchTally::default());
        }

        info!(count = slots.len(), "Retrying previously failed slots");
        let report = self.run_slots(slots).await;

        for (slot, result) in &report.results {
            match result {
                WorkResult::Failed(reason) => self.ledger.record(*slot, reason).await?,
                WorkResult::Success(()) | WorkResult::Skipped => {
                    self.ledger.clear(*slot).await?;
                }
            }
        }

        let tally = tally(&report);
        info!(
            recovered = tally.succeeded + tally.skipped,
            still_failing = tally.failed,
            "Failed slot retry finished"
        );
        Ok(tally)
    }

    async fn run_slots(&self, slots: Vec<u64>) -> PoolReport<()> {
        let source = self.ctx.source.clone();
        let store = self.ctx.store.clone();
        let policy = self.ctx.policy.clone();
        let metrics = self.ctx.metrics.clone();

        self.pool
            .run(slots, &self.ctx.cancel, move |slot| {
                let source = source.clone();
                let store = store.clone();
                let policy = policy.clone();
                let metrics = metrics.clone();
                async move {
                    ingest_slot(slot, source.as_ref(), store.as_ref(), &policy, &metrics).await
                }
            })
            .await
    }

    async fn record_failures(&self, report: &PoolReport<()>) -> Result<(), IngestError> {
        for (slot, reason) in report.failures() {
            if let Err(e) = self.ledger.record(slot, reason).await {
                error!(slot, error = %e, "Failed to record slot in failed-slot ledger");
                return Err(e.into());
            }
        }
        Ok(())
    }
}

async fn ingest_slot(
    slot: u64,
    source: &dyn BeaconSource,
    store: &dyn Datastore,
    policy: &RetryPolicy,
    metrics: &Metrics,
) -> WorkResult<()> {
    match fetch_with_retry(policy, metrics, || source.fetch_slot(slot)).await {
        WorkResult::Success(record) => {
            match store.upsert(BLOCKS, &id_key(slot), record.to_fields()).await {
                Ok(()) => {
                    metrics.increment_persisted(1);
                    debug!(slot, proposer = record.proposer_index, "Persisted block");
                    WorkResult::Success(())
                }
                Err(e) => {
                    metrics.increment_failures(1);
                    warn!(slot, error = %e, "Failed to persist block");
                    WorkResult::Failed(format!("persist failed: {e}"))
                }
            }
        }
        WorkResult::Skipped => {
            metrics.increment_skipped(1);
            debug!(slot, "Missed slot");
            WorkResult::Skipped
        }
        WorkResult::Failed(reason) => {
            metrics.increment_failures(1);
            warn!(slot, reason = %reason, "Failed to fetch block");
            WorkResult::Failed(reason)
        }
    }
}

fn tally<T>(report: &PoolReport<T>) -> BatchTally {
    BatchTally {
        succeeded: report.succeeded() as u64,
        skipped: report.skipped() as u64,
        failed: report.failed() as u64,
    }
}
