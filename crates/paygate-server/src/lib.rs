pub mod config;
pub mod cors;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use state::AppState;
