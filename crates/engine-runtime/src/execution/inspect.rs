use crate::error::RunError;
use engine_config::settings::Settings;
use engine_core::{
    progress::{ProgressService, RunStatus},
    state::sled_store::SledStore,
};
use engine_processing::stats::latest_snapshot;
use model::records::stats::StatsSnapshot;
use std::sync::Arc;

fn open_store(settings: &Settings) -> Result<Arc<SledStore>, RunError> {
    if !settings.data_dir.exists() {
        return Err(RunError::Initialization(format!(
            "No state found at {}; run `slotwatch run` first",
            settings.data_dir.display()
        )));
    }
    Ok(Arc::new(SledStore::open(&settings.data_dir)?))
}

/// Checkpoint, collection sizes and the latest journal entries.
pub async fn status(settings: &Settings, recent: usize) -> Result<RunStatus, RunError> {
    let store = open_store(settings)?;
    Ok(ProgressService::new(store.clone(), store).status(recent).await?)
}

pub async fn latest_stats(settings: &Settings) -> Result<Option<StatsSnapshot>, RunError> {
    let store = open_store(settings)?;
    Ok(latest_snapshot(store.as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::progress::RunStage;

    #[tokio::test]
    async fn missing_state_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::defaults_in(dir.path().join("absent"));

        let err = status(&settings, 5).await.unwrap_err();
        assert!(matches!(err, RunError::Initialization(_)));
    }

    #[tokio::test]
    async fn fresh_store_is_idle_without_stats() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::defaults_in(dir.path());

        let status = status(&settings, 5).await.unwrap();
        assert_eq!(status.stage, RunStage::Idle);
        assert!(latest_stats(&settings).await.unwrap().is_none());
    }
}
