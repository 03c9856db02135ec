use std::env;
use std::time::Duration;

use paygate::constants::{
    DEFAULT_FETCH_LIMIT, DEFAULT_LEDGER_TIMEOUT, DEFAULT_PAYMENT_ADDRESS, DEFAULT_PAYMENT_WINDOW,
    DEFAULT_TOKEN_TTL, SUI_RPC_URL,
};
use paygate::{GatewaySettings, LedgerConfig};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// HMAC key for credentials, fixed for the process lifetime
    pub signing_secret: Vec<u8>,
    /// Token lifetime and payment-check parameters
    pub settings: GatewaySettings,
    /// Ledger endpoint, fetch limit and query timeout
    pub ledger: LedgerConfig,
    /// CORS allowed origins (empty = localhost only)
    pub allowed_origins: Vec<String>,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when none is configured
    pub public_metrics: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("signing_secret", &"[REDACTED]")
            .field("settings", &self.settings)
            .field("ledger", &self.ledger)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(source: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| source(key).filter(|s| !s.trim().is_empty());

        // Required: signing secret
        let signing_secret = var("TOKEN_SIGNING_SECRET")
            .map(String::into_bytes)
            .ok_or(ConfigError::MissingRequired("TOKEN_SIGNING_SECRET"))?;
        if signing_secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                "TOKEN_SIGNING_SECRET is too short ({} bytes, minimum {MIN_SECRET_LEN}); \
                 use `openssl rand -hex 32` to generate a secure secret",
                signing_secret.len()
            );
        }

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("PORT", var("PORT"), DEFAULT_PORT)?;

        let token_ttl = secs_or("TOKEN_TTL_SECS", var("TOKEN_TTL_SECS"), DEFAULT_TOKEN_TTL)?;
        if token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "TOKEN_TTL_SECS",
                value: "0".to_string(),
            });
        }

        let payment_address =
            var("PAYMENT_ADDRESS").unwrap_or_else(|| DEFAULT_PAYMENT_ADDRESS.to_string());
        let payment_window = secs_or(
            "PAYMENT_WINDOW_SECS",
            var("PAYMENT_WINDOW_SECS"),
            DEFAULT_PAYMENT_WINDOW,
        )?;

        // An unusable URL is not fatal: the server starts without a ledger client.
        let rpc_url = var("SUI_RPC_URL").unwrap_or_else(|| SUI_RPC_URL.to_string());
        let ledger_timeout = secs_or(
            "LEDGER_TIMEOUT_SECS",
            var("LEDGER_TIMEOUT_SECS"),
            DEFAULT_LEDGER_TIMEOUT,
        )?;

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = var("METRICS_TOKEN");
        let public_metrics = var("PAYGATE_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if metrics_token.is_none() && !public_metrics {
            tracing::info!("METRICS_TOKEN not set, /metrics is disabled");
        }

        Ok(Self {
            host,
            port,
            signing_secret,
            settings: GatewaySettings {
                token_ttl,
                payment_address,
                payment_window,
            },
            ledger: LedgerConfig {
                rpc_url,
                fetch_limit: DEFAULT_FETCH_LIMIT,
                timeout: ledger_timeout,
            },
            allowed_origins,
            metrics_token,
            public_metrics,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::InvalidValue { var: name, value }),
        },
    }
}

fn secs_or(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse_or(name, raw, default.as_secs()).map(Duration::from_secs)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}
