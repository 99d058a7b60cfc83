use super::{
    BeaconSource, FetchOutcome,
    models::{Envelope, HeaderData, SignedBlock, ValidatorData},
};
use crate::error::FetchError;
use async_trait::async_trait;
use model::records::{slot::SlotRecord, validator::ValidatorRecord};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Beacon Node REST API client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BeaconClient {
    client: Client,
    base_url: String,
}

impl BeaconClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FetchError::Config(format!(
                "beacon url must be http(s): {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(BeaconClient { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<FetchOutcome<T>, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transient {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(classify_status(&url, status));
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transient {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| FetchOutcome::Found(envelope.data))
            .map_err(|e| FetchError::Decode {
                url,
                reason: e.to_string(),
            })
    }
}

fn classify_status(url: &str, status: StatusCode) -> FetchError {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FetchError::Transient {
            url: url.to_string(),
            reason: format!("status {status}"),
        }
    } else {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl BeaconSource for BeaconClient {
    async fn head_slot(&self) -> Result<u64, FetchError> {
        let path = "/eth/v1/beacon/headers/head";
        match self.get_json::<HeaderData>(path).await? {
            FetchOutcome::Found(data) => Ok(data.header.message.slot),
            FetchOutcome::NotFound => Err(FetchError::Status {
                url: format!("{}{}", self.base_url, path),
                status: StatusCode::NOT_FOUND.as_u16(),
            }),
        }
    }

    async fn fetch_slot(&self, slot: u64) -> Result<FetchOutcome<SlotRecord>, FetchError> {
        let outcome = self
            .get_json::<SignedBlock>(&format!("/eth/v2/beacon/blocks/{slot}"))
            .await?;
        Ok(outcome.map(SlotRecord::from))
    }

    async fn fetch_validator(
        &self,
        index: u64,
    ) -> Result<FetchOutcome<ValidatorRecord>, FetchError> {
        let outcome = self
            .get_json::<ValidatorData>(&format!(
                "/eth/v1/beacon/states/head/validators/{index}"
            ))
            .await?;
        Ok(outcome.map(ValidatorRecord::from))
    }
}
