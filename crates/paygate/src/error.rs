use thiserror::Error;

use crate::constants::codes;

/// Credential verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("credential expired")]
    Expired,

    #[error("credential signature mismatch")]
    InvalidSignature,

    #[error("credential signing failed: {0}")]
    Signing(String),
}

/// Token store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("token identity already registered: {0}")]
    Collision(String),
}

/// Errors from the external ledger query.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("ledger rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("ledger response decode error: {0}")]
    Decode(String),

    #[error("ledger query timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LedgerError::Decode(e.to_string())
        } else {
            LedgerError::Transport(e.to_string())
        }
    }
}

/// Why a protected call was refused. Kept distinct for logs and tests;
/// callers only ever see one message for all of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing token")]
    Missing,

    #[error("invalid token: {0}")]
    Invalid(CodecError),

    #[error("token not live in store")]
    NotLive,
}

impl AuthError {
    /// Short label for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid(CodecError::Expired) => "expired",
            AuthError::Invalid(CodecError::InvalidSignature) => "bad_signature",
            AuthError::Invalid(_) => "malformed",
            AuthError::NotLive => "not_live",
        }
    }
}

/// Every outcome of a call that is not a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("parse error")]
    Parse,

    #[error("method not found")]
    MethodNotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),

    #[error("payment not received")]
    PaymentNotReceived,

    #[error("ledger client unavailable")]
    LedgerUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse => codes::PARSE_ERROR,
            RpcError::MethodNotFound => codes::METHOD_NOT_FOUND,
            RpcError::Unauthorized(_) => codes::INVALID_REQUEST,
            RpcError::PaymentNotReceived => codes::PAYMENT_NOT_RECEIVED,
            RpcError::LedgerUnavailable => codes::LEDGER_UNAVAILABLE,
            RpcError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// HTTP status the transport should reply with.
    pub fn http_status(&self) -> u16 {
        match self {
            RpcError::Parse | RpcError::MethodNotFound => 400,
            RpcError::Unauthorized(_) => 401,
            RpcError::PaymentNotReceived => 402,
            RpcError::LedgerUnavailable | RpcError::Internal(_) => 500,
        }
    }

    /// Caller-visible message. Auth failures other than a missing token
    /// share one message so the caller cannot tell which check failed.
    pub fn message(&self) -> String {
        match self {
            RpcError::Parse => "Parse error".to_string(),
            RpcError::MethodNotFound => "Method not found".to_string(),
            RpcError::Unauthorized(AuthError::Missing) => "No access: Missing token".to_string(),
            RpcError::Unauthorized(_) => "No access: Invalid or expired token".to_string(),
            RpcError::PaymentNotReceived => "Payment not received".to_string(),
            RpcError::LedgerUnavailable => "Ledger client unavailable".to_string(),
            RpcError::Internal(msg) => format!("Internal error: {msg}"),
        }
    }
}

impl From<AuthError> for RpcError {
    fn from(e: AuthError) -> Self {
        RpcError::Unauthorized(e)
    }
}
