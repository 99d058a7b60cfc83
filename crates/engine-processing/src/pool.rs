use futures::FutureExt;
use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Outcome of handling one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkResult<T> {
    Success(T),
    /// The item is legitimately absent upstream (e.g. a missed slot).
    Skipped,
    /// The item could not be processed; carries the last error.
    Failed(String),
}

impl<T> WorkResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkResult::Success(_))
    }
}

/// Results of one pool run. Only items whose processing started appear in
/// `results`, in completion order.
#[derive(Debug)]
pub struct PoolReport<T> {
    pub total: usize,
    pub results: Vec<(u64, WorkResult<T>)>,
}

impl<T> PoolReport<T> {
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|r| matches!(r, WorkResult::Success(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, WorkResult::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, WorkResult::Failed(_)))
    }

    /// Every item was processed, i.e. the run was not cut short by cancellation.
    pub fn is_complete(&self) -> bool {
        self.processed() == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = (u64, &str)> {
        self.results.iter().filter_map(|(id, r)| match r {
            WorkResult::Failed(reason) => Some((*id, reason.as_str())),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&WorkResult<T>) -> bool) -> usize {
        self.results.iter().filter(|(_, r)| pred(r)).count()
    }
}

/// Fixed-size pool of worker tasks draining an ordered list of ids.
///
/// Workers claim ids from a shared cursor in input order, so each id is
/// handled at most once. Cancellation is checked before every claim; handlers
/// already running are never interrupted.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    limit: usize,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run<T, H, Fut>(
        &self,
        items: Vec<u64>,
        cancel: &CancellationToken,
        handler: H,
    ) -> PoolReport<T>
    where
        T: Send + 'static,
        H: Fn(u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkResult<T>> + Send + 'static,
    {
        let total = items.len();
        let workers = self.limit.min(total);
        let items: Arc<[u64]> = items.into();
        let cursor = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let items = items.clone();
            let cursor = cursor.clone();
            let handler = handler.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                let mut done = Vec::new();
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }

                    let idx = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(&id) = items.get(idx) else {
                        break;
                    };

                    let handler = handler.clone();
                    let outcome = AssertUnwindSafe(async move { (*handler)(id).await })
                        .catch_unwind()
                        .await;

                    let result = match outcome {
                        Ok(result) => result,
                        Err(panic) => {
                            let reason = panic_message(panic.as_ref());
                            error!(id, reason = %reason, "Handler panicked");
                            WorkResult::Failed(reason)
                        }
                    };
                    done.push((id, result));
                }
                done
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(done) => results.extend(done),
                Err(e) => warn!(error = %e, "Worker task ended abnormally"),
            }
        }

        PoolReport { total, results }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {msg}")
    } else {
        "handler panicked".to_string()
    }
}
