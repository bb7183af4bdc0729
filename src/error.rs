/// file: src/error.rs
/// description: error type for the websocket transport, subscription client and metrics exporter
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] fastwebsockets::WebSocketError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    TlsError(#[from] rustls::Error),

    #[error("WebSocket handshake failed: {reason}")]
    HandshakeFailed { reason: String },

    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}
