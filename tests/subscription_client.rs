use alloy_primitives::{Address, address};
use clawswift_wallet::{
    WalletError,
    client::SubscriptionClient,
    client_state::ConnectionStatus,
    config::Config,
    events::{ClientEvent, EventReceiver, create_event_channel},
    transport::{Connector, Transport},
    types::padded_topic,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");
const BOB: Address = address!("0x00000000000000000000000000000000000000b2");

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

/// The remote end of a `MockTransport`. Dropping it closes the connection.
struct Peer {
    inbound: mpsc::UnboundedSender<String>,
    outbound: mpsc::UnboundedReceiver<String>,
}

fn mock_pair() -> (MockTransport, Peer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    (
        MockTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
        },
        Peer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        },
    )
}

impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> Result<(), WalletError> {
        self.outbound
            .send(text)
            .map_err(|_| WalletError::ConnectionClosed)
    }

    async fn next_text(&mut self) -> Option<Result<String, WalletError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct Script {
    attempts: Vec<Instant>,
    accepts: VecDeque<MockTransport>,
}

/// Hands out queued transports in order and refuses once the queue is empty.
#[derive(Clone, Default)]
struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    fn accept_next(&self) -> Peer {
        let (transport, peer) = mock_pair();
        self.script.lock().unwrap().accepts.push_back(transport);
        peer
    }

    fn attempts(&self) -> Vec<Instant> {
        self.script.lock().unwrap().attempts.clone()
    }
}

impl Connector for ScriptedConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &Url) -> Result<MockTransport, WalletError> {
        let mut script = self.script.lock().unwrap();
        script.attempts.push(Instant::now());
        script.accepts.pop_front().ok_or(WalletError::ConnectionClosed)
    }
}

fn test_config() -> Arc<Config> {
    Arc::new(Config::new(Url::parse("ws://events.test/ws").unwrap()))
}

fn transfer_log(tx_hash: &str, amount: u64) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": {
            "subscription": "0x1",
            "result": {
                "address": "0x20c0000000000000000000000000000000000000",
                "transactionHash": tx_hash,
                "data": format!("0x{amount:064x}"),
                "topics": []
            }
        }
    })
    .to_string()
}

async fn next_event(events: &mut EventReceiver) -> ClientEvent {
    timeout(Duration::from_secs(600), events.recv())
        .await
        .expect("timed out waiting for a client event")
        .expect("event channel closed")
}

/// Collects events up to and including the first one matching `done`.
async fn events_until(
    events: &mut EventReceiver,
    done: impl Fn(&ClientEvent) -> bool,
) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let finished = done(&event);
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

fn notified_ids(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Notification(n) => Some(n.event_id.clone()),
            _ => None,
        })
        .collect()
}

fn is_notification_for(event: &ClientEvent, id: &str) -> bool {
    matches!(event, ClientEvent::Notification(n) if n.event_id == id)
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_then_gives_up() {
    let connector = ScriptedConnector::default();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender);
    let mut seen = events_until(&mut events, |e| {
        matches!(e, ClientEvent::Reconnecting { attempt: 5, .. })
    })
    .await;
    // one reconnect is still due, so the budget is not spent yet
    assert_eq!(client.retry_count(), 5);
    assert!(!client.gave_up());
    assert!(!client.health().gave_up);

    seen.extend(events_until(&mut events, |e| matches!(e, ClientEvent::GaveUp { .. })).await);

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 6);
    let gaps: Vec<u128> = attempts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_millis())
        .collect();
    assert_eq!(gaps, vec![1000, 2000, 4000, 8000, 16000]);

    let scheduled: Vec<(u32, u128)> = seen
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Reconnecting { attempt, delay, .. } => Some((*attempt, delay.as_millis())),
            _ => None,
        })
        .collect();
    assert_eq!(
        scheduled,
        vec![(1, 1000), (2, 2000), (3, 4000), (4, 8000), (5, 16000)]
    );
    assert!(matches!(seen.last(), Some(ClientEvent::GaveUp { retries: 5 })));

    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(client.retry_count(), 5);
    assert!(client.gave_up());
    assert!(client.health().gave_up);

    // nothing else is ever scheduled
    sleep(Duration::from_secs(300)).await;
    assert_eq!(connector.attempts().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_pending_reconnect() {
    let connector = ScriptedConnector::default();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender);
    events_until(&mut events, |e| matches!(e, ClientEvent::Reconnecting { .. })).await;

    client.stop();
    client.stop();

    sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert!(!client.gave_up());
}

#[tokio::test(start_paused = true)]
async fn stop_while_connected_ignores_the_following_close() {
    let connector = ScriptedConnector::default();
    let peer = connector.accept_next();
    // a reconnect would be accepted, so one would show up in the attempts
    let _standby = connector.accept_next();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender);
    events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;
    assert_eq!(client.address(), Some(ALICE));
    assert_eq!(client.health().address, Some(ALICE.to_checksum(None)));

    client.stop();
    drop(peer);

    // the driver is gone: the channel drains and closes without a reconnect
    let mut after_stop = Vec::new();
    while let Some(event) = timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("event channel stayed open after stop")
    {
        after_stop.push(event);
    }
    assert!(
        !after_stop
            .iter()
            .any(|e| matches!(e, ClientEvent::Reconnecting { .. } | ClientEvent::Connecting { .. }))
    );

    sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(client.address(), None);
    assert_eq!(client.health().address, None);
    assert!(!client.gave_up());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_client_cancels_its_driver() {
    let connector = ScriptedConnector::default();
    let (sender, mut events) = create_event_channel();

    {
        let mut client = SubscriptionClient::new(connector.clone(), test_config());
        client.start(ALICE, sender);
        events_until(&mut events, |e| matches!(e, ClientEvent::Reconnecting { .. })).await;
    }

    let closed = timeout(Duration::from_secs(60), async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "driver outlived its client");

    sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_is_harmless() {
    let mut client = SubscriptionClient::new(ScriptedConnector::default(), test_config());
    client.stop();
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(client.address(), None);
    assert_eq!(client.health().address, None);
}

#[tokio::test(start_paused = true)]
async fn subscribes_and_deduplicates_events() {
    let connector = ScriptedConnector::default();
    let mut peer = connector.accept_next();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender);
    events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(client.retry_count(), 0);

    let request: serde_json::Value =
        serde_json::from_str(&peer.outbound.recv().await.unwrap()).unwrap();
    assert_eq!(request["method"], "eth_subscribe");
    assert_eq!(request["params"][1]["topics"][2], padded_topic(ALICE));

    peer.inbound
        .send(json!({"jsonrpc": "2.0", "id": 1, "result": "0xsub"}).to_string())
        .unwrap();
    peer.inbound.send("not json at all".to_string()).unwrap();
    peer.inbound
        .send(json!({"jsonrpc": "2.0", "method": "eth_subscription", "params": {}}).to_string())
        .unwrap();
    peer.inbound.send(transfer_log("0xaa", 1_500_000)).unwrap();
    peer.inbound.send(transfer_log("0xaa", 1_500_000)).unwrap();
    peer.inbound.send(transfer_log("0xbb", 2_000_000)).unwrap();

    let seen = events_until(&mut events, |e| is_notification_for(e, "0xbb")).await;
    assert!(seen.iter().any(|e| matches!(
        e,
        ClientEvent::SubscriptionConfirmed { subscription_id } if subscription_id == "0xsub"
    )));
    assert_eq!(notified_ids(&seen), vec!["0xaa", "0xbb"]);

    let first = seen
        .iter()
        .find_map(|e| match e {
            ClientEvent::Notification(n) => Some(n.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(first.display_amount(), "1.5000");
    assert_eq!(first.token_symbol, "CLAW");

    // malformed input did not cost the connection
    assert_eq!(client.status(), ConnectionStatus::Connected);
    let health = client.health();
    assert_eq!(health.notifications, 2);
    assert_eq!(health.duplicate_events, 1);
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_close_and_keeps_dedup_history() {
    let connector = ScriptedConnector::default();
    let first = connector.accept_next();
    let mut second = connector.accept_next();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender);
    events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;

    first.inbound.send(transfer_log("0xaa", 1)).unwrap();
    events_until(&mut events, |e| is_notification_for(e, "0xaa")).await;

    drop(first);
    let seen = events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;
    assert!(seen.iter().any(|e| matches!(
        e,
        ClientEvent::Reconnecting { attempt: 1, delay, .. } if *delay == Duration::from_millis(1000)
    )));
    assert_eq!(client.retry_count(), 0);
    assert_eq!(connector.attempts().len(), 2);

    // the subscription is re-sent on the new connection
    assert!(second.outbound.recv().await.is_some());

    second.inbound.send(transfer_log("0xaa", 1)).unwrap();
    second.inbound.send(transfer_log("0xcc", 1)).unwrap();
    let seen = events_until(&mut events, |e| is_notification_for(e, "0xcc")).await;
    assert_eq!(notified_ids(&seen), vec!["0xcc"]);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_per_address_and_resets_on_change() {
    let connector = ScriptedConnector::default();
    let alice_peer = connector.accept_next();
    let mut bob_peer = connector.accept_next();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());

    let (sender, mut events) = create_event_channel();
    client.start(ALICE, sender.clone());
    events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;

    client.start(ALICE, sender);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(client.address(), Some(ALICE));

    alice_peer.inbound.send(transfer_log("0xaa", 1)).unwrap();
    events_until(&mut events, |e| is_notification_for(e, "0xaa")).await;

    let (bob_sender, mut bob_events) = create_event_channel();
    client.start(BOB, bob_sender);
    events_until(&mut bob_events, |e| matches!(e, ClientEvent::Connected { .. })).await;
    assert_eq!(client.address(), Some(BOB));
    assert_eq!(connector.attempts().len(), 2);

    let request: serde_json::Value =
        serde_json::from_str(&bob_peer.outbound.recv().await.unwrap()).unwrap();
    assert_eq!(request["params"][1]["topics"][2], padded_topic(BOB));

    // fresh dedup history for the new address
    bob_peer.inbound.send(transfer_log("0xaa", 1)).unwrap();
    events_until(&mut bob_events, |e| is_notification_for(e, "0xaa")).await;
}

#[tokio::test(start_paused = true)]
async fn restart_after_giving_up_gets_a_new_budget() {
    let connector = ScriptedConnector::default();
    let mut client = SubscriptionClient::new(connector.clone(), test_config());
    let (sender, mut events) = create_event_channel();

    client.start(ALICE, sender.clone());
    events_until(&mut events, |e| matches!(e, ClientEvent::GaveUp { .. })).await;
    assert!(client.gave_up());

    let _peer = connector.accept_next();
    client.start(ALICE, sender);
    events_until(&mut events, |e| matches!(e, ClientEvent::Connected { .. })).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(client.retry_count(), 0);
    assert!(!client.gave_up());
}
