//! Reqwest-backed durable store
//!
//! Speaks to the store's named-procedure endpoint: one POST per procedure
//! at `{base}/rpc/{name}` with a JSON argument object. 4xx responses map to
//! [`Error::Rejected`], transport failures and 5xx to
//! [`Error::Persistence`], deadline misses to [`Error::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use inkstream_canvas::Stroke;
use inkstream_core::Config;

use crate::error::{Error, Result};
use crate::store::{
    DurableStore, RevenueSummary, TransactionRecord, UserStats, Withdrawal,
};

/// HTTP client for the durable store's RPC surface.
pub struct RpcStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RpcStore {
    /// Build a store client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_parts(&config.store_rpc_url, &config.store_api_key, config.rpc_timeout)
    }

    /// Build a store client from explicit parts.
    pub fn from_parts(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Persistence(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        procedure: &str,
        args: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/rpc/{}", self.base_url, procedure);
        debug!(procedure, "durable store rpc");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            return Err(Error::Persistence(format!(
                "{procedure} returned {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DurableStore for RpcStore {
    async fn ensure_user(&self, wallet: &str) -> Result<()> {
        self.call("ensure_user", json!({ "wallet_address": wallet }))
            .await
    }

    async fn user_aggregate_stats(&self, wallet: &str) -> Result<UserStats> {
        self.call("get_user_aggregate_stats", json!({ "wallet_address": wallet }))
            .await
    }

    async fn line_credits(&self, wallet: &str) -> Result<u64> {
        self.call("get_line_credits", json!({ "wallet_address": wallet }))
            .await
    }

    async fn revenue(&self, wallet: &str) -> Result<RevenueSummary> {
        self.call("get_revenue", json!({ "wallet_address": wallet }))
            .await
    }

    async fn spend_credit_and_draw(
        &self,
        wallet: &str,
        stroke: &Stroke,
        session_id: Uuid,
    ) -> Result<i64> {
        self.call(
            "spend_credit_and_draw",
            json!({
                "drawer_wallet": wallet,
                "drawing": stroke,
                "session_id": session_id,
            }),
        )
        .await
    }

    async fn add_drawing_segments(&self, session_id: Uuid, strokes: &[Stroke]) -> Result<()> {
        self.call(
            "add_drawing_segments",
            json!({ "session_id": session_id, "segments": strokes }),
        )
        .await
    }

    async fn perform_nuke_cleanup(
        &self,
        wallet: &str,
        session_id: Uuid,
        revenue_per_nuke: u64,
        streamer_share: f64,
    ) -> Result<()> {
        self.call(
            "perform_nuke_cleanup",
            json!({
                "nuker_wallet": wallet,
                "session_id": session_id,
                "revenue_per_nuke": revenue_per_nuke,
                "streamer_share_rate": streamer_share,
            }),
        )
        .await
    }

    async fn claim_all_revenue(&self, wallet: &str) -> Result<u64> {
        self.call("claim_all_revenue", json!({ "streamer_wallet": wallet }))
            .await
    }

    async fn admin_withdraw_revenue(&self) -> Result<Withdrawal> {
        self.call("admin_withdraw_revenue", json!({})).await
    }

    async fn gift_credits(
        &self,
        owner: &str,
        session_id: Uuid,
        viewer: &str,
        lines: u64,
        nukes: u64,
    ) -> Result<String> {
        self.call(
            "gift_credits_to_session",
            json!({
                "owner_wallet": owner,
                "session_id": session_id,
                "viewer_wallet": viewer,
                "lines": lines,
                "nukes": nukes,
            }),
        )
        .await
    }

    async fn session_strokes(&self, session_id: Uuid) -> Result<Vec<Stroke>> {
        self.call("get_session_strokes", json!({ "session_id": session_id }))
            .await
    }

    async fn record_transaction(&self, record: &TransactionRecord) -> Result<i64> {
        self.call("record_transaction", json!({ "record": record }))
            .await
    }

    async fn append_claim_fee(&self, transaction_id: i64, fee_lamports: u64) -> Result<()> {
        self.call(
            "append_claim_fee",
            json!({ "transaction_id": transaction_id, "fee_lamports": fee_lamports }),
        )
        .await
    }
}
