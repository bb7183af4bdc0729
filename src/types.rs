/// file: src/types.rs
/// description: JSON-RPC message types for ERC-20 transfer log subscriptions and the token model
/// reference: https://geth.ethereum.org/docs/interacting-with-geth/rpc/pubsub
use alloy_primitives::{Address, U256, address, hex, utils::format_units};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_EVENT_SIGNATURE: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub const SUBSCRIBE_REQUEST_ID: u64 = 1;

// ERC-20 token the wallet tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub contract: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            contract: address!("0x20c0000000000000000000000000000000000000"),
            symbol: "CLAW".to_string(),
            decimals: 6,
        }
    }
}

// Subscription request types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: (String, LogFilter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    pub address: String,
    /// [event signature, from, to]; `None` is a wildcard
    pub topics: Vec<Option<String>>,
}

impl SubscribeRequest {
    /// Subscribes to `Transfer` logs of `token` whose recipient is `recipient`.
    pub fn incoming_transfers(token: Address, recipient: Address) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: SUBSCRIBE_REQUEST_ID,
            method: "eth_subscribe".to_string(),
            params: (
                "logs".to_string(),
                LogFilter {
                    address: hex::encode_prefixed(token),
                    topics: vec![
                        Some(TRANSFER_EVENT_SIGNATURE.to_string()),
                        None,
                        Some(padded_topic(recipient)),
                    ],
                },
            ),
        }
    }
}

/// Left-pads an address to a 32-byte topic word, lowercase hex.
pub fn padded_topic(address: Address) -> String {
    hex::encode_prefixed(address.into_word())
}

// Response types
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcMessage {
    Notification(SubscriptionNotification),
    Response(RpcResponse),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionNotification {
    pub method: String,
    pub params: SubscriptionParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: Option<String>,
    pub result: LogRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub transaction_hash: String,
    pub data: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

impl LogRecord {
    /// Decodes the uint256 amount carried in `data`.
    pub fn raw_amount(&self) -> Option<U256> {
        let digits = self.data.strip_prefix("0x").unwrap_or(&self.data);
        if digits.is_empty() {
            return None;
        }
        U256::from_str_radix(digits, 16).ok()
    }
}

/// A transfer surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub event_id: String,
    pub amount: String,
    pub token_symbol: String,
    pub received_at: DateTime<Utc>,
}

impl Notification {
    /// Builds a notification from a log, or `None` when the amount is undecodable.
    pub fn from_log(log: &LogRecord, token: &Token) -> Option<Self> {
        let raw = log.raw_amount()?;
        let amount = format_units(raw, token.decimals).ok()?;
        Some(Self {
            event_id: log.transaction_hash.clone(),
            amount,
            token_symbol: token.symbol.clone(),
            received_at: Utc::now(),
        })
    }

    /// Amount with four fractional digits, truncated.
    pub fn display_amount(&self) -> String {
        let (whole, fraction) = self.amount.split_once('.').unwrap_or((&self.amount, ""));
        let mut fraction: String = fraction.chars().take(4).collect();
        while fraction.len() < 4 {
            fraction.push('0');
        }
        format!("{whole}.{fraction}")
    }
}
