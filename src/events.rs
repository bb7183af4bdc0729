/// file: src/events.rs
/// description: Event system to decouple the subscription client from UI presentation
use crate::types::Notification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connecting { url: String, address: String },
    Connected { connection_id: String },
    SubscriptionSent { message: String },
    SubscriptionConfirmed { subscription_id: String },
    Notification(Arc<Notification>),
    ConnectionFailed(String),
    Disconnected,
    Reconnecting { attempt: u32, max_retries: u32, delay: Duration },
    GaveUp { retries: u32 },
}

// Bounded so a stalled consumer cannot grow memory without limit
const EVENT_CHANNEL_CAPACITY: usize = 1_024;

pub type EventSender = mpsc::Sender<ClientEvent>;
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
