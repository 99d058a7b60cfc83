#[cfg(test)]
mod tests {
    use crate::utils::{FakeBeacon, executor, settings};
    use engine_core::{
        progress::{ProgressService, RunStage},
        state::{
            BLOCKS, Datastore, FAILED_SLOTS, STATS, StateStore, filter::Filter,
            models::INGEST_CHECKPOINT, sled_store::SledStore,
        },
    };
    use engine_processing::stats::{StatsOutcome, latest_snapshot};
    use engine_runtime::execution::executor;
    use serde_json::{Value, json};
    use std::sync::{Arc, atomic::Ordering};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;
    use wiremock::{
        Mock, MockServer, Request, Respond, ResponseTemplate,
        matchers::{method, path, path_regex},
    };

    async fn checkpoint(store: &SledStore) -> Option<u64> {
        store
            .load_checkpoint(INGEST_CHECKPOINT)
            .await
            .unwrap()
            .map(|cp| cp.last_processed)
    }

    async fn stage(store: &Arc<SledStore>) -> RunStage {
        ProgressService::new(store.clone(), store.clone())
            .status(5)
            .await
            .unwrap()
            .stage
    }

    // Scenario: cold start against a head of 449 with three missed slots.
    // Expected: five committed batches, one stats snapshot, journal ends with RunDone.
    #[traced_test]
    #[tokio::test]
    async fn full_run_from_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path()).unwrap());
        let source = Arc::new(FakeBeacon::new(449, 40).with_missing([7, 100, 333]));
        let settings = settings(dir.path());

        let summary = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.head_slot, 449);
        assert_eq!(summary.resumed_from, 0);
        assert_eq!(summary.ingest.batches_committed, 5);
        assert_eq!(summary.metrics.records_persisted, 447);
        assert_eq!(summary.metrics.records_skipped, 3);
        assert_eq!(checkpoint(&store).await, Some(449));
        assert_eq!(store.count(BLOCKS, &Filter::All).await.unwrap(), 447);

        let Some(StatsOutcome::Computed(snapshot)) = summary.stats else {
            panic!("expected computed stats, got {:?}", summary.stats);
        };
        // Every fifth slot matches; slot 100 was missed.
        assert_eq!(snapshot.matched_blocks, 89);
        assert_eq!(snapshot.distinct_proposers, 8);
        assert_eq!(snapshot.unique_operators, 8);
        assert_eq!(snapshot.active_validators, 5);
        assert_eq!(source.validator_calls.load(Ordering::SeqCst), 8);

        assert_eq!(stage(&store).await, RunStage::Done);
        assert!(logs_contain("Batch committed"));
        assert!(logs_contain("Run completed"));
    }

    // Scenario: second run with the head unchanged.
    // Expected: no slot fetches, known validators refreshed, stats left as they were.
    #[tokio::test]
    async fn rerun_with_unchanged_head_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path()).unwrap());
        let source = Arc::new(FakeBeacon::new(199, 40));
        let settings = settings(dir.path());

        executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();
        let slot_calls = source.slot_calls.load(Ordering::SeqCst);
        let before = store.find_many(STATS, &Filter::All, None).await.unwrap();

        let summary = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert_eq!(summary.resumed_from, 200);
        assert_eq!(summary.ingest.range, None);
        assert_eq!(summary.stats, Some(StatsOutcome::AlreadyComputed));
        assert_eq!(summary.recheck.map(|r| r.refreshed), Some(8));
        assert_eq!(source.slot_calls.load(Ordering::SeqCst), slot_calls);
        assert_eq!(store.find_many(STATS, &Filter::All, None).await.unwrap(), before);
    }

    // Scenario: the head advances between runs.
    // Expected: only the new slots are fetched and a second snapshot is appended.
    #[tokio::test]
    async fn advancing_head_ingests_only_new_slots() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path()).unwrap());
        let source = Arc::new(FakeBeacon::new(299, 40));
        let settings = settings(dir.path());

        executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        source.set_head(349);
        let calls_before = source.slot_calls.load(Ordering::SeqCst);
        let summary = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert_eq!(summary.resumed_from, 300);
        assert_eq!(summary.ingest.batches_committed, 1);
        assert_eq!(source.slot_calls.load(Ordering::SeqCst) - calls_before, 50);
        assert_eq!(store.count(STATS, &Filter::All).await.unwrap(), 2);

        let latest = latest_snapshot(store.as_ref()).await.unwrap().unwrap();
        assert_eq!(latest.head_slot, 349);
    }

    // Scenario: shutdown requested while the third batch is in flight, then a fresh run.
    // Expected: checkpoint stays at the last full batch; the resumed run ends in the
    // same state as an uninterrupted one.
    #[traced_test]
    #[tokio::test]
    async fn interrupted_run_resumes_to_same_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path().join("a")).unwrap());
        let source = Arc::new(FakeBeacon::new(999, 40).with_missing([5, 250, 640]));
        let settings = settings(dir.path());

        let cancel = CancellationToken::new();
        source.cancel_after(250, cancel.clone());
        let summary = executor(&settings, source.clone(), store.clone(), cancel)
            .execute()
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.ingest.last_committed, Some(199));
        assert!(summary.stats.is_none());
        assert_eq!(checkpoint(&store).await, Some(199));
        assert_eq!(stage(&store).await, RunStage::Interrupted);
        assert!(logs_contain("Run interrupted"));

        let resumed = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();
        assert!(!resumed.interrupted);
        assert_eq!(resumed.resumed_from, 200);
        assert_eq!(checkpoint(&store).await, Some(999));

        let reference = Arc::new(SledStore::open(dir.path().join("b")).unwrap());
        let fresh = Arc::new(FakeBeacon::new(999, 40).with_missing([5, 250, 640]));
        executor(&settings, fresh, reference.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert_eq!(
            store.find_many(BLOCKS, &Filter::All, None).await.unwrap(),
            reference.find_many(BLOCKS, &Filter::All, None).await.unwrap()
        );

        let strip = |mut doc: Value| {
            if let Some(fields) = doc.as_object_mut() {
                fields.remove("created_at");
            }
            doc
        };
        let a: Vec<Value> = store
            .find_many(STATS, &Filter::All, None)
            .await
            .unwrap()
            .into_iter()
            .map(strip)
            .collect();
        let b: Vec<Value> = reference
            .find_many(STATS, &Filter::All, None)
            .await
            .unwrap()
            .into_iter()
            .map(strip)
            .collect();
        assert_eq!(a, b);
    }

    // Scenario: three slots keep failing, then the node recovers.
    // Expected: batches still commit; the next run drains the failed-slot ledger.
    #[tokio::test]
    async fn failed_slots_are_recovered_on_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SledStore::open(dir.path()).unwrap());
        let source = Arc::new(FakeBeacon::new(299, 40));
        source.break_slots([42, 43, 250]);
        let mut settings = settings(dir.path());
        settings.retry_limit = 3;

        let summary = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.ingest.tally.failed, 3);
        assert_eq!(summary.metrics.retry_count, 6);
        assert_eq!(checkpoint(&store).await, Some(299));
        assert_eq!(store.count(FAILED_SLOTS, &Filter::All).await.unwrap(), 3);
        assert_eq!(store.count(BLOCKS, &Filter::All).await.unwrap(), 297);

        source.heal();
        let summary = executor(&settings, source.clone(), store.clone(), CancellationToken::new())
            .execute()
            .await
            .unwrap();

        assert_eq!(summary.retried.succeeded, 3);
        assert_eq!(store.count(FAILED_SLOTS, &Filter::All).await.unwrap(), 0);
        assert_eq!(store.count(BLOCKS, &Filter::All).await.unwrap(), 300);
    }

    struct BlockResponder;

    impl Respond for BlockResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let slot: u64 = request
                .url
                .path()
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();

            if slot == 13 {
                return ResponseTemplate::new(404).set_body_json(json!({
                    "code": 404,
                    "message": "NOT_FOUND: beacon block"
                }));
            }

            ResponseTemplate::new(200).set_body_json(json!({
                "version": "deneb",
                "data": {
                    "message": {
                        "slot": slot.to_string(),
                        "proposer_index": (slot % 4).to_string(),
                        "body": {
                            "graffiti": format!("0x{}{}", "6f6b", "00".repeat(30)),
                            "execution_payload": {
                                "fee_recipient": "0x0000000000000000000000000000000000000001",
                                "block_number": (100 + slot).to_string()
                            }
                        }
                    }
                }
            }))
        }
    }

    struct ValidatorResponder;

    impl Respond for ValidatorResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let index: u64 = request
                .url
                .path()
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();

            ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "index": index.to_string(),
                    "status": "active_ongoing",
                    "validator": {
                        "withdrawal_credentials":
                            format!("0x01{}{:040x}", "00".repeat(11), index % 2)
                    }
                }
            }))
        }
    }

    // Scenario: a full run through the HTTP client against a mocked beacon node.
    #[tokio::test]
    async fn run_against_http_beacon_node() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/eth/v1/beacon/headers/head"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "header": { "message": { "slot": "19" } } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/eth/v2/beacon/blocks/\d+$"))
            .respond_with(BlockResponder)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/eth/v1/beacon/states/head/validators/\d+$"))
            .respond_with(ValidatorResponder)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir.path().join("state"));
        settings.beacon_url = server.uri();
        settings.batch_size = 10;
        settings.graffiti_term = String::new();
        settings.retry_base_delay = std::time::Duration::from_millis(1);

        let summary = executor::run(&settings, CancellationToken::new())
            .await
            .unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.head_slot, 19);
        assert_eq!(summary.ingest.batches_committed, 2);
        assert_eq!(summary.metrics.records_persisted, 19);
        assert_eq!(summary.metrics.records_skipped, 1);

        let Some(StatsOutcome::Computed(snapshot)) = summary.stats else {
            panic!("expected computed stats, got {:?}", summary.stats);
        };
        assert_eq!(snapshot.matched_blocks, 19);
        assert_eq!(snapshot.distinct_proposers, 4);
        assert_eq!(snapshot.unique_operators, 2);
        assert_eq!(snapshot.active_validators, 4);
    }
}
