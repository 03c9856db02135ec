//! Routes decoded calls to `issue_token`, `get_time` and `echo`.
//!
//! ```text
//! Received ─► Routed ─┬─ issue_token ─► oracle ─┬─ paid ─► store + codec ─► Authorized
//!                     │                         └─ not paid ───────────────► Rejected (402)
//!                     ├─ get_time / echo ─► credential ─► codec ─► store ─┬─► Authorized
//!                     │                                                   └─► Rejected (401)
//!                     └─ anything else ───────────────────────────────────► Rejected (400)
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::constants::{methods, GatewaySettings, ECHO_PREFIX};
use crate::error::{AuthError, CodecError, RpcError};
use crate::ledger::LedgerClient;
use crate::oracle::PaymentOracle;
use crate::rpc::{RpcCall, RpcReply, RpcResponse};
use crate::token::{expiry_after, TokenCodec, TokenId};
use crate::token_store::{InMemoryTokenStore, TokenStore};

/// RFC 1123 date in GMT, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The token state machine. Safe to share across workers: the store
/// serializes its own mutations and the oracle holds no state.
pub struct Dispatcher<L> {
    codec: TokenCodec,
    store: Arc<dyn TokenStore>,
    oracle: Option<PaymentOracle<L>>,
    settings: GatewaySettings,
}

impl<L: LedgerClient> Dispatcher<L> {
    /// Create a dispatcher with an in-memory token store.
    ///
    /// `oracle` is `None` when no ledger client could be built; issuance then
    /// fails with "ledger client unavailable" while protected calls still work.
    pub fn new(
        codec: TokenCodec,
        oracle: Option<PaymentOracle<L>>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            codec,
            store: Arc::new(InMemoryTokenStore::new()),
            oracle,
            settings,
        }
    }

    /// Use a caller-owned token store.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = store;
        self
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn has_ledger(&self) -> bool {
        self.oracle.is_some()
    }

    /// Decode a raw request body, dispatch it and build the reply.
    pub async fn handle_body(&self, body: &[u8]) -> RpcReply {
        let call = match RpcCall::parse(body) {
            Ok(call) => call,
            Err(e) => {
                tracing::debug!("unparseable rpc body");
                return reply(Value::Null, "invalid", Err(e));
            }
        };

        let label = method_label(&call);
        let outcome = self.dispatch(&call).await;
        reply(call.id.clone(), label, outcome)
    }

    /// Route a call and run it.
    pub async fn dispatch(&self, call: &RpcCall) -> Result<Value, RpcError> {
        let outcome = match call.method_name() {
            Some(methods::ISSUE_TOKEN) => self.issue_token().await,
            Some(name @ (methods::GET_TIME | methods::ECHO)) => self.protected(name, call),
            _ => Err(RpcError::MethodNotFound),
        };

        let method = call.method_name().unwrap_or("<none>");
        match &outcome {
            Ok(_) => tracing::info!(id = %call.id, method, "rpc call completed"),
            Err(RpcError::Unauthorized(auth)) => {
                tracing::info!(id = %call.id, method, reason = auth.reason(), "rpc call rejected")
            }
            Err(e) => tracing::info!(id = %call.id, method, error = %e, "rpc call rejected"),
        }
        outcome
    }

    async fn issue_token(&self) -> Result<Value, RpcError> {
        let oracle = self.oracle.as_ref().ok_or(RpcError::LedgerUnavailable)?;

        let paid = oracle
            .has_recent_payment(&self.settings.payment_address, self.settings.payment_window)
            .await;
        if !paid {
            return Err(RpcError::PaymentNotReceived);
        }

        // One expiry instant seals both the store record and the credential claim.
        let identity = TokenId::generate();
        let expires_at = expiry_after(self.settings.token_ttl);

        self.store
            .register_until(identity.clone(), expires_at)
            .map_err(|e| RpcError::Internal(e.to_string()))?;

        match self.codec.issue_until(&identity, expires_at) {
            Ok(credential) => {
                tracing::info!(token_id = %identity, %expires_at, "access token issued");
                Ok(Value::String(credential))
            }
            Err(e) => {
                self.store.revoke(&identity);
                Err(RpcError::Internal(e.to_string()))
            }
        }
    }

    fn protected(&self, method: &str, call: &RpcCall) -> Result<Value, RpcError> {
        let args = self.authorize(method, call)?;

        let result = match method {
            methods::GET_TIME => Utc::now().format(HTTP_DATE_FORMAT).to_string(),
            _ => echo(&args),
        };
        Ok(Value::String(result))
    }

    /// Find and check the credential; returns the parameters left for the method.
    fn authorize(&self, method: &str, call: &RpcCall) -> Result<Vec<Value>, AuthError> {
        let (candidate, args) = extract_credential(method, call);

        let credential = candidate.ok_or(AuthError::Missing)?;
        let credential = credential.as_str().ok_or_else(|| {
            AuthError::Invalid(CodecError::Malformed("credential is not a string".into()))
        })?;

        let identity = self.codec.verify(credential).map_err(AuthError::Invalid)?;

        if !self.store.check_live(&identity) {
            return Err(AuthError::NotLive);
        }
        Ok(args)
    }
}

/// Pick the credential: the dedicated `token` member wins; otherwise the first
/// positional parameter is taken and the rest shift left.
///
/// The shift differs by method: `echo` keeps `params[1..]`, `get_time` keeps
/// nothing. Intent behind the asymmetry is unclear; it is preserved as observed.
fn extract_credential(method: &str, call: &RpcCall) -> (Option<Value>, Vec<Value>) {
    let params = call.params.as_array();

    if let Some(token) = call.token.as_ref().filter(|t| is_truthy(t)) {
        return (Some(token.clone()), params.cloned().unwrap_or_default());
    }

    match params.and_then(|p| p.split_first()) {
        Some((first, rest)) => {
            let args = if method == methods::ECHO {
                rest.to_vec()
            } else {
                Vec::new()
            };
            let candidate = is_truthy(first).then(|| first.clone());
            (candidate, args)
        }
        None => (None, params.cloned().unwrap_or_default()),
    }
}

fn echo(args: &[Value]) -> String {
    match args.first() {
        Some(Value::String(s)) => format!("{ECHO_PREFIX}, {s}"),
        Some(other) => format!("{ECHO_PREFIX}, {other}"),
        None => ECHO_PREFIX.to_string(),
    }
}

/// Empty strings, nulls, zeroes and empty containers count as "not supplied".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn method_label(call: &RpcCall) -> &'static str {
    match call.method_name() {
        Some(methods::ISSUE_TOKEN) => methods::ISSUE_TOKEN,
        Some(methods::GET_TIME) => methods::GET_TIME,
        Some(methods::ECHO) => methods::ECHO,
        _ => "unknown",
    }
}

fn reply(id: Value, method: &'static str, outcome: Result<Value, RpcError>) -> RpcReply {
    match outcome {
        Ok(result) => RpcReply {
            status: 200,
            body: RpcResponse::success(result, id),
            method,
            reason: None,
        },
        Err(e) => RpcReply {
            status: e.http_status(),
            body: RpcResponse::failure(&e, id),
            method,
            reason: Some(rejection_reason(&e)),
        },
    }
}

fn rejection_reason(e: &RpcError) -> &'static str {
    match e {
        RpcError::Parse => "parse_error",
        RpcError::MethodNotFound => "method_not_found",
        RpcError::Unauthorized(auth) => auth.reason(),
        RpcError::PaymentNotReceived => "payment_not_received",
        RpcError::LedgerUnavailable => "ledger_unavailable",
        RpcError::Internal(_) => "internal_error",
    }
}
