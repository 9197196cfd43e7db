use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{HarnessError, Result};

/// Tendermint RPC client used to watch a node from the host
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Raw `/status` result
    pub async fn status(&self) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/status", self.endpoint))
            .timeout(Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        if let Some(error) = body.get("error") {
            return Err(HarnessError::UnexpectedOutput(format!("RPC error: {}", error)));
        }
        // CometBFT 0.34 wraps the result in a JSON-RPC envelope, 0.38 may not
        Ok(body.get("result").cloned().unwrap_or(body))
    }

    /// Check if the node answers status requests
    pub async fn is_running(&self) -> bool {
        self.status().await.is_ok()
    }

    /// Get the current block height
    pub async fn latest_height(&self) -> Result<u64> {
        let status = self.status().await?;

        let height_str = status
            .get("sync_info")
            .and_then(|s| s.get("latest_block_height"))
            .and_then(|h| h.as_str())
            .ok_or_else(|| {
                HarnessError::UnexpectedOutput("Could not parse block height from status".to_string())
            })?;

        height_str.parse::<u64>().map_err(|e| {
            HarnessError::UnexpectedOutput(format!("Could not parse block height as u64: {}", e))
        })
    }

    /// Chain id reported by the node
    pub async fn network(&self) -> Result<String> {
        let status = self.status().await?;
        status
            .get("node_info")
            .and_then(|n| n.get("network"))
            .and_then(|n| n.as_str())
            .map(str::to_string)
            .ok_or_else(|| HarnessError::UnexpectedOutput("status has no node_info.network".to_string()))
    }

    /// Wait for the node to answer status requests
    pub async fn wait_for_ready(&self, timeout: Duration, poll: Duration) -> Result<()> {
        let start_time = Instant::now();

        while start_time.elapsed() < timeout {
            if self.is_running().await {
                return Ok(());
            }
            sleep(poll).await;
        }

        Err(HarnessError::Timeout {
            what: format!("RPC at {}", self.endpoint),
            after: timeout,
        })
    }

    /// Wait until the chain reaches `target` height
    pub async fn wait_for_height(&self, target: u64, timeout: Duration, poll: Duration) -> Result<u64> {
        let start_time = Instant::now();

        while start_time.elapsed() < timeout {
            match self.latest_height().await {
                Ok(height) if height >= target => return Ok(height),
                Ok(height) => debug!("Height {} of {}", height, target),
                Err(e) => debug!("Status not available yet: {}", e),
            }
            sleep(poll).await;
        }

        Err(HarnessError::Timeout {
            what: format!("block height {} at {}", target, self.endpoint),
            after: timeout,
        })
    }
}
