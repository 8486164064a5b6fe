//! Chain RPC boundary
//!
//! The chain node is an external collaborator reached over JSON-RPC. Three
//! operations matter to the core: submit a native-currency transfer from
//! the treasury, fetch a finalized transaction by signature, and confirm a
//! submitted transfer against its blockhash/last-valid-height pair. Key
//! custody lives behind the node; the core never handles signing material.
//!
//! All amounts are lamports (the chain's smallest unit). Conversion to a
//! display unit is presentation-only and never happens here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use inkstream_core::Config;

use crate::error::{Error, Result};

/// A transfer accepted by the chain but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransfer {
    /// Transaction signature
    pub signature: String,
    /// Recent blockhash the transfer was built against
    pub blockhash: String,
    /// Last block height at which the blockhash is valid
    pub last_valid_height: u64,
}

/// A finalized on-chain transfer, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedTransfer {
    /// Transaction signature
    pub signature: String,
    /// Source wallet
    pub sender: String,
    /// Destination wallet
    pub receiver: String,
    /// Transferred amount in lamports
    pub lamports: u64,
    /// Execution error recorded on chain, if any
    pub err: Option<String>,
    /// Network fee paid, in lamports
    pub fee_lamports: u64,
}

impl FinalizedTransfer {
    /// Whether the transfer executed without an on-chain error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

/// Operations the core needs from the chain node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a treasury transfer of `lamports` to `to`.
    async fn submit_transfer(&self, to: &str, lamports: u64) -> Result<SubmittedTransfer>;

    /// Fetch a finalized transaction by signature. `None` when the chain
    /// has no finalized record of it.
    async fn finalized_transfer(&self, signature: &str) -> Result<Option<FinalizedTransfer>>;

    /// Wait for a submitted transfer to confirm. Returns the fee paid, in
    /// lamports. Fails with [`Error::NotConfirmed`] once the blockhash
    /// expires.
    async fn confirm(&self, submitted: &SubmittedTransfer) -> Result<u64>;
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmResult {
    confirmed: bool,
    fee_lamports: u64,
}

/// JSON-RPC 2.0 client for the treasury chain node.
pub struct RpcChain {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl RpcChain {
    /// Build a chain client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_parts(&config.chain_rpc_url, config.rpc_timeout)
    }

    /// Build a chain client from explicit parts.
    pub fn from_parts(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Chain(format!("http client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "chain rpc");

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Chain(e.to_string()))?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_value(response.result)?)
    }
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn submit_transfer(&self, to: &str, lamports: u64) -> Result<SubmittedTransfer> {
        self.call(
            "submitTransfer",
            json!({ "to": to, "lamports": lamports }),
        )
        .await
    }

    async fn finalized_transfer(&self, signature: &str) -> Result<Option<FinalizedTransfer>> {
        self.call("getFinalizedTransfer", json!({ "signature": signature }))
            .await
    }

    async fn confirm(&self, submitted: &SubmittedTransfer) -> Result<u64> {
        let result: ConfirmResult = self
            .call("confirmTransfer", serde_json::to_value(submitted)?)
            .await?;
        if !result.confirmed {
            return Err(Error::NotConfirmed(submitted.signature.clone()));
        }
        Ok(result.fee_lamports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalized_transfer_parses_wire_shape() {
        let transfer: FinalizedTransfer = serde_json::from_value(json!({
            "signature": "5Sig",
            "sender": "Buyer1111",
            "receiver": "Treasury1111",
            "lamports": 2_500_000u64,
            "err": null,
            "feeLamports": 5_000u64,
        }))
        .unwrap();
        assert!(transfer.succeeded());
        assert_eq!(transfer.lamports, 2_500_000);
    }

    #[test]
    fn test_null_result_is_absent_transfer() {
        let response: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": null })).unwrap();
        let parsed: Option<FinalizedTransfer> =
            serde_json::from_value(response.result).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_rpc_error_body_surfaces() {
        let response: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "unknown signature" },
        }))
        .unwrap();
        let err = response.error.unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "unknown signature");
    }
}
