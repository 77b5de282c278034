//! HTTP node wrapping a single shared [`ledger_core::Ledger`].

pub mod api;
pub mod config;
mod constants;
pub mod error;
pub mod peers;

pub use api::{router, AppState};
pub use config::NodeConfig;
pub use peers::HttpPeerTransport;
