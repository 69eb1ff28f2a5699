//! Coin transfer client.
//!
//! The contract is at-most-once-attempted: `send` makes exactly one attempt
//! and never retries internally. After a failed attempt the on-chain outcome
//! is unknown, so any retry is an operator decision.

use std::time::Duration;

use async_trait::async_trait;
use merit_types::{CoinAmount, DestAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer service answered and refused the transfer.
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The transfer service could not be reached or answered garbage.
    #[error("transfer request failed: {0}")]
    Http(String),
}

/// Sends coins to a destination address.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Execute one transfer attempt and return the transfer reference.
    async fn send(
        &self,
        destination: &DestAddress,
        amount: CoinAmount,
        memo: &str,
    ) -> Result<String, TransferError>;
}

#[derive(Serialize)]
struct TransferBody<'a> {
    destination: &'a str,
    amount_nanos: u64,
    memo: &'a str,
}

#[derive(Deserialize)]
struct TransferResponse {
    tx_ref: String,
}

/// Transfer client posting to an HTTP payout gateway.
///
/// POSTs `{destination, amount_nanos, memo}` and expects `{"tx_ref": ...}`.
#[derive(Clone)]
pub struct HttpTransferClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransferClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransferError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    async fn send(
        &self,
        destination: &DestAddress,
        amount: CoinAmount,
        memo: &str,
    ) -> Result<String, TransferError> {
        let body = TransferBody {
            destination: destination.as_str(),
            amount_nanos: amount.nanos(),
            memo,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransferError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransferError::Rejected(format!("HTTP {status}: {detail}")));
        }
        if !status.is_success() {
            return Err(TransferError::Http(format!(
                "transfer endpoint returned HTTP {status}"
            )));
        }

        let parsed: TransferResponse = response
            .json()
            .await
            .map_err(|e| TransferError::Http(format!("invalid JSON response: {e}")))?;
        Ok(parsed.tx_ref)
    }
}
