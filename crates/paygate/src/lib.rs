//! Payment-gated access tokens for a single-endpoint JSON-RPC gateway.
//!
//! A caller pays on-chain, calls `issue_token`, and receives a signed
//! credential only if a qualifying transfer shows up on the ledger within a
//! short window. The credential then unlocks `get_time` and `echo` until it
//! expires or its server-side record goes away.
//!
//! # Components
//!
//! - [`TokenCodec`]: signs and verifies credentials (HS256)
//! - [`TokenStore`]: registry of issued identities with lazy expiry
//! - [`PaymentOracle`]: "was a payment seen recently", backed by a [`LedgerClient`]
//! - [`Dispatcher`]: the per-call state machine tying the above together
//!
//! # Example
//!
//! ```no_run
//! use paygate::{Dispatcher, GatewaySettings, LedgerConfig, PaymentOracle, SuiLedgerClient, TokenCodec};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ledger = SuiLedgerClient::new(&LedgerConfig::default()).unwrap();
//! let dispatcher = Dispatcher::new(
//!     TokenCodec::new(b"a-long-random-signing-secret"),
//!     Some(PaymentOracle::new(ledger)),
//!     GatewaySettings::default(),
//! );
//!
//! let reply = dispatcher
//!     .handle_body(br#"{"method":"issue_token","params":[],"id":1}"#)
//!     .await;
//! println!("{} {}", reply.status, serde_json::to_string(&reply.body).unwrap());
//! # }
//! ```

pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod rpc;
pub mod token;
pub mod token_store;

pub use constants::GatewaySettings;
pub use dispatcher::Dispatcher;
pub use error::{AuthError, CodecError, LedgerError, RpcError, StoreError};
pub use ledger::{LedgerClient, LedgerConfig, SuiLedgerClient, TransferRecord};
pub use oracle::PaymentOracle;
pub use rpc::{RpcCall, RpcErrorObject, RpcReply, RpcResponse};
pub use token::{TokenCodec, TokenId};
pub use token_store::{InMemoryTokenStore, IssuedTokenRecord, Liveness, TokenStore};
