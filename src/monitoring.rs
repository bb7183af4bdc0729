/// file: src/monitoring.rs
/// description: prometheus counters for the transfer watcher and the health snapshot
use crate::error::WalletError;
use chrono::{DateTime, Utc};
use metrics::{Counter, Gauge, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::info;

const MESSAGES_RECEIVED: &str = "clawswift_messages_received_total";
const TRANSFER_NOTIFICATIONS: &str = "clawswift_transfer_notifications_total";
const DUPLICATE_EVENTS: &str = "clawswift_duplicate_events_total";
const DISCARDED_MESSAGES: &str = "clawswift_discarded_messages_total";
const RECONNECTS: &str = "clawswift_reconnects_total";
const CONNECTED: &str = "clawswift_connected";

pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!(MESSAGES_RECEIVED));
pub static NOTIFICATION_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!(TRANSFER_NOTIFICATIONS));
pub static DUPLICATE_EVENT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!(DUPLICATE_EVENTS));
pub static DISCARDED_MESSAGE_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!(DISCARDED_MESSAGES));
pub static RECONNECT_COUNTER: LazyLock<Counter> = LazyLock::new(|| counter!(RECONNECTS));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!(CONNECTED));

fn describe_metrics() {
    describe_counter!(MESSAGES_RECEIVED, "Text frames received from the event endpoint");
    describe_counter!(TRANSFER_NOTIFICATIONS, "Incoming transfers surfaced to the user");
    describe_counter!(DUPLICATE_EVENTS, "Transfer events dropped as already seen");
    describe_counter!(DISCARDED_MESSAGES, "Inbound messages that could not be used");
    describe_counter!(RECONNECTS, "Reconnects scheduled after an unexpected close");
    describe_gauge!(CONNECTED, "1 while the subscription connection is open");
}

/// Serves `/metrics` on `0.0.0.0:<port>`. Must run inside the tokio runtime.
pub async fn setup_metrics(port: u16) -> Result<(), WalletError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "clawswift-wallet")
        .add_global_label("version", env!("CARGO_PKG_VERSION"))
        .install()
        .map_err(|e| WalletError::MetricsError(e.to_string()))?;

    describe_metrics();
    CONNECTED_GAUGE.set(0.0);
    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}

/// Point-in-time view of a `SubscriptionClient`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub address: Option<String>,
    pub connection_id: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub gave_up: bool,
    pub total_messages: u64,
    pub notifications: u64,
    pub duplicate_events: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "connected"
    }

    pub fn uptime(&self) -> chrono::Duration {
        self.started_at
            .map(|started| Utc::now() - started)
            .unwrap_or_else(chrono::Duration::zero)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(fields) = value.as_object_mut() {
            fields.insert("healthy".into(), self.is_healthy().into());
            fields.insert("uptime_seconds".into(), self.uptime().num_seconds().into());
        }
        value
    }
}
