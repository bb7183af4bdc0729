// file: src/client.rs
// description: reconnecting subscription client for incoming ERC-20 transfer notifications
// reference: https://geth.ethereum.org/docs/interacting-with-geth/rpc/pubsub

use crate::{
    client_state::{
        CloseDecision, ConnectionState, ConnectionStatus, SharedConnectionState, lock_state,
    },
    config::Config,
    events::{ClientEvent, EventSender},
    monitoring::{
        CONNECTED_GAUGE, DISCARDED_MESSAGE_COUNTER, DUPLICATE_EVENT_COUNTER, HealthStatus,
        MESSAGES_RECEIVED_COUNTER, NOTIFICATION_COUNTER, RECONNECT_COUNTER,
    },
    transport::{Connector, Transport},
    types::{LogRecord, Notification, RpcMessage, SUBSCRIBE_REQUEST_ID, SubscribeRequest},
};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

struct Session {
    address: Address,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps one live subscription for one address and retries with backoff.
///
/// Must be used from inside a tokio runtime; `start` spawns the driver task.
pub struct SubscriptionClient<C: Connector> {
    connector: Arc<C>,
    config: Arc<Config>,
    state: SharedConnectionState,
    session: Option<Session>,
    started_at: Option<DateTime<Utc>>,
}

impl<C: Connector> SubscriptionClient<C> {
    pub fn new(connector: C, config: Arc<Config>) -> Self {
        let state = ConnectionState::new(config.websocket.retry);
        Self {
            connector: Arc::new(connector),
            config,
            state: Arc::new(Mutex::new(state)),
            session: None,
            started_at: None,
        }
    }

    /// Starts watching `address`. A no-op while already connecting or
    /// connected to the same address; any other call replaces the session.
    pub fn start(&mut self, address: Address, events: EventSender) {
        if let Some(session) = &self.session
            && session.address == address
            && matches!(
                self.status(),
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            )
        {
            debug!("Subscription for {} already active", address);
            return;
        }

        self.stop();

        let generation = {
            let mut state = lock_state(&self.state);
            let generation = if state.address == Some(address) {
                state.rearm()
            } else {
                state.reset_session(address)
            };
            state.begin_connecting(generation);
            generation
        };

        let cancel = CancellationToken::new();
        let driver = Driver {
            connector: self.connector.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            events,
            cancel: cancel.clone(),
            address,
            generation,
        };

        info!(
            "Starting transfer subscription for {} (session {})",
            address, generation
        );
        self.started_at = Some(Utc::now());
        self.session = Some(Session {
            address,
            cancel,
            handle: tokio::spawn(driver.run()),
        });
    }

    /// Closes the connection and cancels any pending reconnect. Safe to call
    /// repeatedly and from any state.
    pub fn stop(&mut self) {
        lock_state(&self.state).mark_stopped();

        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            session.handle.abort();
            CONNECTED_GAUGE.set(0.0);
            info!("Stopped transfer subscription for {}", session.address);
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        lock_state(&self.state).status
    }

    pub fn retry_count(&self) -> u32 {
        lock_state(&self.state).retry_count
    }

    /// Address of the current session; `None` before `start` and after `stop`.
    pub fn address(&self) -> Option<Address> {
        self.session.as_ref().map(|session| session.address)
    }

    pub fn gave_up(&self) -> bool {
        lock_state(&self.state).gave_up()
    }

    pub fn health(&self) -> HealthStatus {
        let address = self.address().map(|a| a.to_checksum(None));
        let state = lock_state(&self.state);
        HealthStatus {
            status: state.status.as_str(),
            address,
            connection_id: state.connection_id.clone(),
            retry_count: state.retry_count,
            max_retries: state.policy().max_retries,
            gave_up: state.gave_up(),
            total_messages: state.total_messages_received,
            notifications: state.notifications,
            duplicate_events: state.duplicate_events,
            started_at: self.started_at,
        }
    }
}

impl<C: Connector> Drop for SubscriptionClient<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Driver<C: Connector> {
    connector: Arc<C>,
    config: Arc<Config>,
    state: SharedConnectionState,
    events: EventSender,
    cancel: CancellationToken,
    address: Address,
    generation: u64,
}

impl<C: Connector> Driver<C> {
    async fn run(self) {
        loop {
            if !lock_state(&self.state).begin_connecting(self.generation) {
                return;
            }

            self.send_event(ClientEvent::Connecting {
                url: self.config.websocket.url.to_string(),
                address: self.address.to_checksum(None),
            })
            .await;

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = self.run_session() => {}
            }

            CONNECTED_GAUGE.set(0.0);
            let decision = lock_state(&self.state).on_unexpected_close(self.generation);

            match decision {
                CloseDecision::Stopped => return,
                CloseDecision::Retry(retry) => {
                    let deadline = Instant::now() + retry.delay;
                    RECONNECT_COUNTER.increment(1);
                    warn!(
                        "Reconnecting in {}ms (attempt {}/{})",
                        retry.delay.as_millis(),
                        retry.attempt,
                        self.config.websocket.retry.max_retries
                    );

                    self.send_event(ClientEvent::Disconnected).await;
                    self.send_event(ClientEvent::Reconnecting {
                        attempt: retry.attempt,
                        max_retries: self.config.websocket.retry.max_retries,
                        delay: retry.delay,
                    })
                    .await;

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = sleep_until(deadline) => {}
                    }
                }
                CloseDecision::GiveUp { retries } => {
                    error!(
                        "Maximum reconnection attempts ({}) reached, giving up",
                        retries
                    );
                    self.send_event(ClientEvent::Disconnected).await;
                    self.send_event(ClientEvent::GaveUp { retries }).await;
                    return;
                }
            }
        }
    }

    /// One connection from open to close. Every way out of here is a close.
    async fn run_session(&self) {
        let url = &self.config.websocket.url;
        let mut transport = match self.connector.connect(url).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Failed to connect to {}: {}", url, e);
                self.send_event(ClientEvent::ConnectionFailed(e.to_string()))
                    .await;
                return;
            }
        };

        let request = SubscribeRequest::incoming_transfers(self.config.token.contract, self.address);
        let message = match serde_json::to_string(&request) {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to serialize subscription message: {}", e);
                return;
            }
        };

        if let Err(e) = transport.send_text(message.clone()).await {
            warn!("Failed to send subscription message: {}", e);
            self.send_event(ClientEvent::ConnectionFailed(e.to_string()))
                .await;
            return;
        }

        let connection_id = {
            let mut state = lock_state(&self.state);
            if !state.on_connected(self.generation) {
                return;
            }
            state.connection_id.clone().unwrap_or_default()
        };

        CONNECTED_GAUGE.set(1.0);
        info!(
            connection_id = %connection_id,
            "WebSocket connection established to {}", url
        );
        self.send_event(ClientEvent::Connected { connection_id }).await;
        self.send_event(ClientEvent::SubscriptionSent { message }).await;

        while let Some(message) = transport.next_text().await {
            match message {
                Ok(text) => self.handle_text(&text).await,
                Err(e) => {
                    warn!("WebSocket stream error: {}", e);
                    transport.close().await;
                    return;
                }
            }
        }

        info!("WebSocket stream ended");
    }

    async fn handle_text(&self, text: &str) {
        trace!("Received text message: {}", text);
        MESSAGES_RECEIVED_COUNTER.increment(1);
        lock_state(&self.state).record_message();

        let message = match serde_json::from_str::<RpcMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                DISCARDED_MESSAGE_COUNTER.increment(1);
                debug!(
                    "Discarding unparseable message: {}. Message: {}",
                    e,
                    text.chars().take(100).collect::<String>()
                );
                return;
            }
        };

        match message {
            RpcMessage::Notification(notification) if notification.method == "eth_subscription" => {
                self.handle_log(notification.params.result).await;
            }
            RpcMessage::Notification(notification) => {
                debug!("Ignoring {} notification", notification.method);
            }
            RpcMessage::Response(response) => {
                if let Some(error) = response.error {
                    warn!(code = error.code, "Subscription request failed: {}", error.message);
                } else if response.id == Some(SUBSCRIBE_REQUEST_ID)
                    && let Some(serde_json::Value::String(subscription_id)) = response.result
                {
                    info!("Subscription confirmed: {}", subscription_id);
                    self.send_event(ClientEvent::SubscriptionConfirmed { subscription_id })
                        .await;
                } else {
                    DISCARDED_MESSAGE_COUNTER.increment(1);
                    debug!("Ignoring response with id {:?}", response.id);
                }
            }
        }
    }

    async fn handle_log(&self, log: LogRecord) {
        let Some(notification) = Notification::from_log(&log, &self.config.token) else {
            DISCARDED_MESSAGE_COUNTER.increment(1);
            debug!(
                "Discarding log {} with undecodable data",
                log.transaction_hash
            );
            return;
        };

        let fresh = lock_state(&self.state).record_event(self.generation, &notification.event_id);
        if !fresh {
            DUPLICATE_EVENT_COUNTER.increment(1);
            debug!("Duplicate event {}", notification.event_id);
            return;
        }

        NOTIFICATION_COUNTER.increment(1);
        info!(
            event_id = %notification.event_id,
            amount = %notification.amount,
            symbol = %notification.token_symbol,
            "Incoming transfer"
        );
        self.send_event(ClientEvent::Notification(Arc::new(notification)))
            .await;
    }

    async fn send_event(&self, event: ClientEvent) {
        if self.events.send(event).await.is_err() {
            trace!("Event receiver dropped");
        }
    }
}
