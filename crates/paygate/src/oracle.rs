//! Proof-of-payment check against the ledger.
//!
//! A payment is "observed" when one of the most recent transfers to the
//! monitored address landed within a short trailing window. This accepts
//! false negatives (payment not yet indexed) and false positives (unrelated
//! traffic to the same address inside the window).

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_FETCH_LIMIT, DEFAULT_LEDGER_TIMEOUT};
use crate::error::LedgerError;
use crate::ledger::{LedgerClient, LedgerConfig, TransferRecord};

/// Answers "was a qualifying transfer seen recently". Never fails outward:
/// ledger errors and timeouts read as "not observed".
#[derive(Debug, Clone)]
pub struct PaymentOracle<L> {
    ledger: L,
    fetch_limit: usize,
    timeout: Duration,
}

impl<L: LedgerClient> PaymentOracle<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    /// Take fetch limit and timeout from a ledger configuration.
    pub fn with_config(ledger: L, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            fetch_limit: config.fetch_limit,
            timeout: config.timeout,
        }
    }

    /// Bound on a single ledger query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// `true` if a transfer to `address` landed within `window` of now.
    pub async fn has_recent_payment(&self, address: &str, window: Duration) -> bool {
        match self.find_recent_payment(address, window).await {
            Ok(Some(record)) => {
                tracing::info!(address, digest = %record.digest, "qualifying payment observed");
                true
            }
            Ok(None) => {
                tracing::info!(
                    address,
                    window_secs = window.as_secs(),
                    "no qualifying payment in window"
                );
                false
            }
            Err(e) => {
                tracing::warn!(address, error = %e, "ledger query failed, treating as not paid");
                false
            }
        }
    }

    async fn find_recent_payment(
        &self,
        address: &str,
        window: Duration,
    ) -> Result<Option<TransferRecord>, LedgerError> {
        let records = tokio::time::timeout(
            self.timeout,
            self.ledger.recent_transfers(address, self.fetch_limit),
        )
        .await
        .map_err(|_| LedgerError::Timeout(self.timeout))??;

        Ok(first_within_window(records, window, Utc::now()))
    }
}

/// First record (in ledger order, newest first) whose timestamp is no older
/// than `window` before `now`.
fn first_within_window(
    records: Vec<TransferRecord>,
    window: Duration,
    now: DateTime<Utc>,
) -> Option<TransferRecord> {
    let window =
        chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(36_500));
    let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    records
        .into_iter()
        .find(|r| r.timestamp.is_some_and(|ts| ts >= cutoff))
}
