use std::time::Duration;

/// JSON-RPC protocol version echoed in every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Lifetime of an issued credential and its backing record.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Trailing window within which a transfer counts as payment.
pub const DEFAULT_PAYMENT_WINDOW: Duration = Duration::from_secs(10);

/// Number of most recent transfers fetched per payment check.
pub const DEFAULT_FETCH_LIMIT: usize = 10;

/// Upper bound on a single ledger query.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Sui mainnet full node.
pub const SUI_RPC_URL: &str = "https://fullnode.mainnet.sui.io:443";

/// Address whose inbound transfers are treated as payment.
pub const DEFAULT_PAYMENT_ADDRESS: &str =
    "0x95831b91dc0d4761530daa520274cc7bb1256b579784d7d223814c3f05c45b26";

/// Prefix of every `echo` reply.
pub const ECHO_PREFIX: &str = "Dear User";

/// RPC method names.
pub mod methods {
    pub const ISSUE_TOKEN: &str = "issue_token";
    pub const GET_TIME: &str = "get_time";
    pub const ECHO: &str = "echo";
}

/// JSON-RPC error codes returned to callers.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const LEDGER_UNAVAILABLE: i64 = -32000;
    pub const PAYMENT_NOT_RECEIVED: i64 = -32001;
}

/// Issuance and payment-check settings shared by the dispatcher and oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub token_ttl: Duration,
    pub payment_address: String,
    pub payment_window: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
            payment_address: DEFAULT_PAYMENT_ADDRESS.to_string(),
            payment_window: DEFAULT_PAYMENT_WINDOW,
        }
    }
}
