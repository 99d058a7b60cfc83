use crate::{context::DriverContext, error::StatsError, recheck::Rechecker};
use chrono::Utc;
use engine_core::state::{BLOCKS, Datastore, STATS, VALIDATORS, filter::Filter, id_key};
use model::records::{stats::StatsSnapshot, validator::ValidatorStatus};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome {
    Computed(StatsSnapshot),
    /// A snapshot for this head slot already exists.
    AlreadyComputed,
    /// Cancelled while refreshing proposers; nothing was written.
    Interrupted,
    /// Some proposers could not be fetched; nothing was written so the next
    /// run computes the snapshot for this head again.
    Deferred { failed: u64 },
}

/// Final aggregation over the persisted blocks.
pub struct StatsAggregator {
    ctx: DriverContext,
    rechecker: Rechecker,
}

impl StatsAggregator {
    pub fn new(ctx: DriverContext) -> Self {
        Self {
            rechecker: Rechecker::new(ctx.clone()),
            ctx,
        }
    }

    fn filter(&self) -> Filter {
        let term = self.ctx.config.graffiti_term.trim();
        if term.is_empty() {
            Filter::All
        } else {
            Filter::contains("graffiti", term)
        }
    }

    /// Computes and stores one snapshot for `head_slot`. Proposers of matching
    /// blocks that have no validator document yet are fetched first. Operator
    /// and active counts are recomputed over every matching proposer.
    pub async fn compute_stats(&self, head_slot: u64) -> Result<StatsOutcome, StatsError> {
        let store = &self.ctx.store;
        let key = id_key(head_slot);

        if store.get(STATS, &key).await?.is_some() {
            info!(head_slot, "Stats already computed for head, skipping");
            return Ok(StatsOutcome::AlreadyComputed);
        }

        let filter = self.filter();
        let matched_blocks = store.count(BLOCKS, &filter).await?;
        let proposers: HashSet<u64> = store
            .distinct(BLOCKS, "proposer_index", &filter)
            .await?
            .iter()
            .filter_map(Value::as_u64)
            .collect();

        let mut unknown = Vec::new();
        for &index in &proposers {
            if store.get(VALIDATORS, &id_key(index)).await?.is_none() {
                unknown.push(index);
            }
        }

        if !unknown.is_empty() {
            info!(count = unknown.len(), "Fetching newly seen proposers");
            let report = self.rechecker.recheck_all(unknown).await;
            if report.interrupted {
                warn!(head_slot, "Stats computation interrupted");
                return Ok(StatsOutcome::Interrupted);
            }
            if report.failed > 0 {
                warn!(
                    head_slot,
                    failed = report.failed,
                    "Could not fetch every proposer, stats deferred to the next run"
                );
                return Ok(StatsOutcome::Deferred {
                    failed: report.failed,
                });
            }
        }

        let validators = store
            .find_many(
                VALIDATORS,
                &Filter::All,
                Some(&["index", "status", "withdrawal_address"][..]),
            )
            .await?;

        let mut operators = HashSet::new();
        let mut active_validators = 0u64;
        for doc in validators
            .iter()
            .filter(|doc| doc["index"].as_u64().is_some_and(|i| proposers.contains(&i)))
        {
            if let Some(address) = doc["withdrawal_address"].as_str() {
                operators.insert(address.to_string());
            }
            let active = serde_json::from_value::<ValidatorStatus>(doc["status"].clone())
                .is_ok_and(|status| status.is_active());
            if active {
                active_validators += 1;
            }
        }

        let snapshot = StatsSnapshot {
            head_slot,
            filter_term: self.ctx.config.graffiti_term.clone(),
            matched_blocks,
            distinct_proposers: proposers.len() as u64,
            unique_operators: operators.len() as u64,
            active_validators,
            created_at: Utc::now(),
        };

        store.upsert(STATS, &key, snapshot.to_fields()).await?;

        info!(
            head_slot,
            matched_blocks,
            distinct_proposers = snapshot.distinct_proposers,
            unique_operators = snapshot.unique_operators,
            active_validators,
            "Stats computed"
        );
        Ok(StatsOutcome::Computed(snapshot))
    }

    /// Most recent snapshot, by head slot.
    pub async fn latest(&self) -> Result<Option<StatsSnapshot>, StatsError> {
        latest_snapshot(self.ctx.store.as_ref()).await
    }
}

pub async fn latest_snapshot(
    store: &dyn Datastore,
) -> Result<Option<StatsSnapshot>, StatsError> {
    let docs = store.find_many(STATS, &Filter::All, None).await?;
    match docs.into_iter().last() {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}
