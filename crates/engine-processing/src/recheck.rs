use crate::{
    context::DriverContext,
    error::RecheckError,
    fetch::fetch_with_retry,
    pool::{WorkResult, WorkerPool},
};
use engine_core::{
    progress::ProgressReporter,
    state::{VALIDATORS, filter::Filter, id_key},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecheckReport {
    pub total: u64,
    pub refreshed: u64,
    /// Indices the node does not know.
    pub missing: u64,
    pub failed: u64,
    pub interrupted: bool,
}

/// Refreshes validator status for an arbitrary set of indices in one pool
/// run. No checkpoint: every upsert is keyed by index, so re-running from
/// scratch is always safe.
#[derive(Clone)]
pub struct Rechecker {
    ctx: DriverContext,
    pool: WorkerPool,
}

impl Rechecker {
    pub fn new(ctx: DriverContext) -> Self {
        Self {
            pool: WorkerPool::new(ctx.config.recheck_concurrency),
            ctx,
        }
    }

    /// Indices of every validator already stored.
    pub async fn known_validators(&self) -> Result<Vec<u64>, RecheckError> {
        let values = self
            .ctx
            .store
            .distinct(VALIDATORS, "index", &Filter::All)
            .await?;

        let mut ids: Vec<u64> = values.iter().filter_map(Value::as_u64).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn recheck_all(&self, mut ids: Vec<u64>) -> RecheckReport {
        ids.sort_unstable();
        ids.dedup();

        let total = ids.len() as u64;
        if total == 0 {
            return RecheckReport::default();
        }

        info!(
            validators = total,
            concurrency = self.pool.limit(),
            "Starting validator recheck"
        );

        let progress = Arc::new(ProgressReporter::new(
            "recheck",
            total,
            self.ctx.config.progress_interval,
        ));
        let source = self.ctx.source.clone();
        let store = self.ctx.store.clone();
        let policy = self.ctx.policy.clone();
        let metrics = self.ctx.metrics.clone();
        let ticker = progress.clone();

        let report = self
            .pool
            .run(ids, &self.ctx.cancel, move |index| {
                let source = source.clone();
                let store = store.clone();
                let policy = policy.clone();
                let metrics = metrics.clone();
                let ticker = ticker.clone();

                async move {
                    let fetched =
                        fetch_with_retry(&policy, &metrics, || source.fetch_validator(index)).await;

                    let result = match fetched {
                        WorkResult::Success(record) => {
                            let fields = record.to_fields();
                            match store.upsert(VALIDATORS, &id_key(index), fields).await {
                                Ok(()) => {
                                    metrics.increment_validators(1);
                                    debug!(index, status = %record.status, "Refreshed validator");
                                    WorkResult::Success(())
                                }
                                Err(e) => {
                                    warn!(index, error = %e, "Failed to persist validator");
                                    WorkResult::Failed(e.to_string())
                                }
                            }
                        }
                        WorkResult::Skipped => {
                            debug!(index, "Validator unknown to node");
                            WorkResult::Skipped
                        }
                        WorkResult::Failed(reason) => {
                            warn!(index, reason = %reason, "Failed to fetch validator");
                            WorkResult::Failed(reason)
                        }
                    };

                    if matches!(result, WorkResult::Failed(_)) {
                        metrics.increment_failures(1);
                    }
                    ticker.tick(1);
                    result
                }
            })
            .await;

        progress.finish();

        RecheckReport {
            total,
            refreshed: report.succeeded() as u64,
            missing: report.skipped() as u64,
            failed: report.failed() as u64,
            interrupted: !report.is_complete(),
        }
    }
}
