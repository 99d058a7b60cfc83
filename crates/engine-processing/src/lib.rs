pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod ledger;
pub mod pool;
pub mod recheck;
pub mod retry;
pub mod state_manager;
pub mod stats;

#[cfg(test)]
mod test_support;
