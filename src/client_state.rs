/// file: src/client_state.rs
/// description: connection status, backoff bookkeeping and event dedup, separate from client I/O
use alloy_primitives::Address;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_retries: 5,
        }
    }
}

/// A reconnect the close handler decided to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    pub attempt: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// `stop()` or a newer `start()` owns the state now.
    Stopped,
    Retry(ScheduledRetry),
    GiveUp { retries: u32 },
}

#[derive(Debug)]
pub struct ConnectionState {
    pub address: Option<Address>,
    pub status: ConnectionStatus,
    pub connection_id: Option<String>,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub intentional_close: bool,
    pub total_messages_received: u64,
    pub notifications: u64,
    pub duplicate_events: u64,
    gave_up: bool,
    generation: u64,
    policy: RetryPolicy,
    seen_event_ids: HashSet<String>,
}

impl ConnectionState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            address: None,
            status: ConnectionStatus::Disconnected,
            connection_id: None,
            retry_count: 0,
            retry_delay: policy.base_delay,
            intentional_close: false,
            total_messages_received: 0,
            notifications: 0,
            duplicate_events: 0,
            gave_up: false,
            generation: 0,
            policy,
            seen_event_ids: HashSet::new(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fresh logical session for `address`: clears dedup history and retry state.
    /// Returns the generation the new driver must present.
    pub fn reset_session(&mut self, address: Address) -> u64 {
        self.address = Some(address);
        self.seen_event_ids.clear();
        self.notifications = 0;
        self.duplicate_events = 0;
        self.total_messages_received = 0;
        self.rearm()
    }

    /// Same address, new attempt budget. Dedup history is kept.
    pub fn rearm(&mut self) -> u64 {
        self.reset_retries();
        self.intentional_close = false;
        self.gave_up = false;
        self.status = ConnectionStatus::Disconnected;
        self.connection_id = None;
        self.generation += 1;
        self.generation
    }

    fn reset_retries(&mut self) {
        self.retry_count = 0;
        self.retry_delay = self.policy.base_delay;
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.intentional_close && self.generation == generation
    }

    /// Returns false when `stop()` got here first.
    pub fn begin_connecting(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        true
    }

    pub fn on_connected(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.connection_id = Some(uuid::Uuid::new_v4().to_string());
        self.status = ConnectionStatus::Connected;
        self.gave_up = false;
        self.reset_retries();
        true
    }

    /// Close handler: the stop check and the retry decision happen together.
    pub fn on_unexpected_close(&mut self, generation: u64) -> CloseDecision {
        if !self.is_current(generation) {
            return CloseDecision::Stopped;
        }
        self.status = ConnectionStatus::Disconnected;
        self.connection_id = None;

        if self.retry_count >= self.policy.max_retries {
            self.gave_up = true;
            return CloseDecision::GiveUp {
                retries: self.retry_count,
            };
        }

        let delay = self.retry_delay;
        self.retry_delay = (delay * 2).min(self.policy.max_delay);
        self.retry_count += 1;
        CloseDecision::Retry(ScheduledRetry {
            attempt: self.retry_count,
            delay,
        })
    }

    pub fn mark_stopped(&mut self) {
        self.intentional_close = true;
        self.status = ConnectionStatus::Disconnected;
        self.connection_id = None;
    }

    /// True once the budget is spent and no reconnect is pending. A later
    /// `stop()` leaves the flag set; `rearm` or a connection clears it.
    pub fn gave_up(&self) -> bool {
        self.gave_up
    }

    /// Returns true the first time an event id is seen in this session.
    pub fn record_event(&mut self, generation: u64, event_id: &str) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        if self.seen_event_ids.contains(event_id) {
            self.duplicate_events += 1;
            return false;
        }
        self.seen_event_ids.insert(event_id.to_string());
        self.notifications += 1;
        true
    }

    pub fn seen_events(&self) -> usize {
        self.seen_event_ids.len()
    }

    pub fn record_message(&mut self) {
        self.total_messages_received += 1;
    }
}

pub type SharedConnectionState = Arc<Mutex<ConnectionState>>;

/// The lock is never held across an await, so a poisoned guard is still usable.
pub fn lock_state(state: &SharedConnectionState) -> MutexGuard<'_, ConnectionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
