use std::sync::Arc;

use paygate::{Dispatcher, PaymentOracle, SuiLedgerClient, TokenCodec};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<SuiLedgerClient>>,
    /// Bearer token required for /metrics
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}

impl AppState {
    /// Build the dispatcher from configuration.
    ///
    /// A ledger endpoint that does not parse, or a client that cannot be
    /// built, leaves the server running without a ledger: `issue_token`
    /// then answers "ledger client unavailable".
    pub fn new(config: &ServerConfig) -> Self {
        let oracle = match build_ledger(config) {
            Ok(ledger) => {
                tracing::info!(rpc_url = %ledger.rpc_url(), "ledger client ready");
                Some(PaymentOracle::with_config(ledger, &config.ledger))
            }
            Err(e) => {
                tracing::error!(
                    rpc_url = %config.ledger.rpc_url,
                    error = %e,
                    "ledger client unavailable, token issuance disabled"
                );
                None
            }
        };

        let dispatcher = Dispatcher::new(
            TokenCodec::new(&config.signing_secret),
            oracle,
            config.settings.clone(),
        );

        Self::from_parts(
            dispatcher,
            config.metrics_token.as_ref().map(|t| t.as_bytes().to_vec()),
            config.public_metrics,
        )
    }

    pub fn from_parts(
        dispatcher: Dispatcher<SuiLedgerClient>,
        metrics_token: Option<Vec<u8>>,
        public_metrics: bool,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            metrics_token,
            public_metrics,
        }
    }
}

fn build_ledger(config: &ServerConfig) -> Result<SuiLedgerClient, String> {
    let parsed = url::Url::parse(&config.ledger.rpc_url).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme: {}", parsed.scheme()));
    }
    SuiLedgerClient::new(&config.ledger).map_err(|e| e.to_string())
}
