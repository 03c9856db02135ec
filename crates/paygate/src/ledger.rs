//! Client for the external ledger the payment check reads from.
//!
//! [`LedgerClient`] is the seam: the oracle only needs "recent transfers to
//! an address". [`SuiLedgerClient`] implements it over Sui's JSON-RPC
//! `suix_queryTransactionBlocks`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::constants::{DEFAULT_FETCH_LIMIT, DEFAULT_LEDGER_TIMEOUT, SUI_RPC_URL};
use crate::error::LedgerError;

/// A transfer observed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub digest: String,
    /// Checkpoint time. Absent for transactions not yet checkpointed.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Source of recent inbound transfers.
pub trait LedgerClient: Send + Sync {
    /// Up to `limit` most recent transfers to `address`, newest first.
    fn recent_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<TransferRecord>, LedgerError>> + Send;
}

/// Ledger endpoint and query bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub fetch_limit: usize,
    pub timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: SUI_RPC_URL.to_string(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct TransactionBlockPage {
    #[serde(default)]
    data: Vec<TransactionBlock>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBlock {
    digest: String,
    #[serde(default)]
    timestamp_ms: Option<String>,
}

impl TransactionBlock {
    fn into_record(self) -> TransferRecord {
        let timestamp = self
            .timestamp_ms
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);
        TransferRecord {
            digest: self.digest,
            timestamp,
        }
    }
}

/// Sui full-node JSON-RPC client.
#[derive(Debug, Clone)]
pub struct SuiLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl SuiLedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

impl LedgerClient for SuiLedgerClient {
    async fn recent_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, LedgerError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "suix_queryTransactionBlocks",
            "params": [
                {
                    "filter": { "ToAddress": address },
                    "options": { "showInput": false, "showEffects": false },
                },
                null,
                limit,
                true,
            ],
        });

        let resp = self
            .http
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: RpcEnvelope<TransactionBlockPage> = resp.json().await?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let page = envelope
            .result
            .ok_or_else(|| LedgerError::Decode("response has neither result nor error".into()))?;

        Ok(page
            .data
            .into_iter()
            .take(limit)
            .map(TransactionBlock::into_record)
            .collect())
    }
}
