//! Fail-fast configuration
//!
//! Required endpoints and secrets are validated eagerly at startup. A missing
//! value produces [`Error::NotConfigured`] instead of degraded operation.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default deadline for durable-store RPC calls.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration for the whiteboard core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the durable store's named-procedure endpoint
    pub store_rpc_url: String,

    /// API key sent with durable-store calls
    pub store_api_key: String,

    /// WebSocket URL of the broadcast relay
    pub relay_url: String,

    /// URL of the chain RPC endpoint
    pub chain_rpc_url: String,

    /// Treasury wallet that receives purchases and pays out claims
    pub treasury_wallet: String,

    /// Revenue per nuke, in lamports
    #[serde(default = "default_revenue_per_nuke")]
    pub revenue_per_nuke_lamports: u64,

    /// Streamer share of nuke revenue, 0.0..=1.0
    #[serde(default = "default_streamer_share")]
    pub streamer_share_rate: f64,

    /// Deadline applied to durable-store RPC calls
    #[serde(default = "default_rpc_timeout", with = "duration_secs")]
    pub rpc_timeout: Duration,
}

fn default_revenue_per_nuke() -> u64 {
    5_000_000
}

fn default_streamer_share() -> f64 {
    0.8
}

fn default_rpc_timeout() -> Duration {
    DEFAULT_RPC_TIMEOUT
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file if present, then requires `INKSTREAM_STORE_RPC_URL`,
    /// `INKSTREAM_STORE_API_KEY`, `INKSTREAM_RELAY_URL`,
    /// `INKSTREAM_CHAIN_RPC_URL`, and `INKSTREAM_TREASURY_WALLET`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            store_rpc_url: require("INKSTREAM_STORE_RPC_URL")?,
            store_api_key: require("INKSTREAM_STORE_API_KEY")?,
            relay_url: require("INKSTREAM_RELAY_URL")?,
            chain_rpc_url: require("INKSTREAM_CHAIN_RPC_URL")?,
            treasury_wallet: require("INKSTREAM_TREASURY_WALLET")?,
            revenue_per_nuke_lamports: optional_u64(
                "INKSTREAM_REVENUE_PER_NUKE_LAMPORTS",
                default_revenue_per_nuke(),
            )?,
            streamer_share_rate: optional_f64(
                "INKSTREAM_STREAMER_SHARE_RATE",
                default_streamer_share(),
            )?,
            rpc_timeout: Duration::from_secs(optional_u64(
                "INKSTREAM_RPC_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate field values beyond mere presence.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.streamer_share_rate) {
            return Err(Error::Validation(format!(
                "streamer share rate {} outside 0.0..=1.0",
                self.streamer_share_rate
            )));
        }
        if self.rpc_timeout.is_zero() {
            return Err(Error::Validation("rpc timeout must be nonzero".into()));
        }
        if self.treasury_wallet.trim().is_empty() {
            return Err(Error::NotConfigured("INKSTREAM_TREASURY_WALLET".into()));
        }
        Ok(())
    }
}

fn require(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::NotConfigured(name.to_string())),
    }
}

fn optional_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| Error::Validation(format!("{name} is not a valid integer"))),
        Err(_) => Ok(default),
    }
}

fn optional_f64(name: &str, default: f64) -> Result<f64> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| Error::Validation(format!("{name} is not a valid number"))),
        Err(_) => Ok(default),
    }
}
