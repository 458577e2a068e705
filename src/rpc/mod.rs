pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::{AssetTransfer, MetadataEntry, TxDetails, UtxoSet};
use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: StatusCode },

    #[error("{endpoint} returned an unexpected body: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Read access to a ledger indexer.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Most recent transaction ids touching `asset_id`, newest first.
    async fn recent_transfers(
        &self,
        asset_id: &str,
        count: usize,
    ) -> Result<Vec<String>, FetchError>;
    async fn transaction(&self, tx_id: &str) -> Result<TxDetails, FetchError>;
    async fn utxos(&self, tx_id: &str) -> Result<UtxoSet, FetchError>;
    async fn metadata(&self, tx_id: &str) -> Result<Vec<MetadataEntry>, FetchError>;
}

/// Blockfrost REST client. Every request goes through the retry policy.
pub struct BlockfrostClient {
    base_url: String,
    project_id: String,
    client: Client,
    retry: RetryPolicy,
}

impl BlockfrostClient {
    pub fn new(
        base_url: &str,
        project_id: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            client,
            retry,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        self.retry.run(endpoint, || self.get_once(endpoint)).await
    }

    async fn get_once<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .header("project_id", &self.project_id)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        let body = resp.text().await?;
        decode(endpoint, &body)
    }
}

/// Parse a response body, keeping schema mismatches apart from transport errors.
fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[async_trait]
impl LedgerApi for BlockfrostClient {
    async fn recent_transfers(
        &self,
        asset_id: &str,
        count: usize,
    ) -> Result<Vec<String>, FetchError> {
        let transfers: Vec<AssetTransfer> = self
            .get(&format!("/assets/{asset_id}/transactions?order=desc&count={count}"))
            .await?;
        Ok(transfers.into_iter().map(|t| t.tx_hash).collect())
    }

    async fn transaction(&self, tx_id: &str) -> Result<TxDetails, FetchError> {
        self.get(&format!("/txs/{tx_id}")).await
    }

    async fn utxos(&self, tx_id: &str) -> Result<UtxoSet, FetchError> {
        self.get(&format!("/txs/{tx_id}/utxos")).await
    }

    async fn metadata(&self, tx_id: &str) -> Result<Vec<MetadataEntry>, FetchError> {
        self.get(&format!("/txs/{tx_id}/metadata")).await
    }
}
