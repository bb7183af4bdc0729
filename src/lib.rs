#![doc = include_str!("../docs/rustdoc.md")]

/// Command-line argument definitions.
pub mod cli;
/// Subscription client and its reconnect driver.
pub mod client;
/// Connection state, backoff bookkeeping and event dedup.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between client and UI.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Payment URI parsing and building.
pub mod intent;
/// Metrics and health status structures.
pub mod monitoring;
/// Displayed notifications and their expiry.
pub mod notifications;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Send-form validation and transfer calldata.
pub mod transfer;
/// WebSocket connector and transport traits.
pub mod transport;
/// JSON-RPC wire types and the token model.
pub mod types;
/// UI controller and presentation loop.
pub mod ui;
/// Wallet record storage.
pub mod wallet_store;

/// Primary crate error type.
pub use error::WalletError;
