/// file: src/ui.rs
/// description: ui presentation layer that handles events from the subscription client
use crate::{
    config::OutputConfig,
    events::{ClientEvent, EventReceiver},
    formatter::{Colors, NotificationFormatter},
    notifications::NotificationBoard,
};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

/// Why the UI loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    GaveUp,
    ChannelClosed,
}

pub struct UIController {
    event_receiver: EventReceiver,
    formatter: NotificationFormatter,
    board: NotificationBoard,
    quiet_mode: bool,
    colored: bool,
}

impl UIController {
    pub fn new(event_receiver: EventReceiver, output: &OutputConfig, display_timeout: Duration) -> Self {
        Self {
            event_receiver,
            formatter: NotificationFormatter::new(output.format.clone(), output.colored),
            board: NotificationBoard::new(display_timeout),
            quiet_mode: output.quiet,
            colored: output.colored,
        }
    }

    pub async fn run(&mut self) -> UiExit {
        self.print_startup_banner();
        loop {
            let next_expiry = self.board.next_expiry();
            tokio::select! {
                event = self.event_receiver.recv() => {
                    let Some(event) = event else {
                        return UiExit::ChannelClosed;
                    };
                    if let Some(exit) = self.handle_event(event) {
                        return exit;
                    }
                }
                _ = sleep_until(next_expiry.unwrap_or_else(Instant::now)), if next_expiry.is_some() => {
                    for expired in self.board.expire(Instant::now()) {
                        if let Some(line) = self.formatter.format_expired(&expired) {
                            if !self.quiet_mode {
                                println!("{line}");
                            }
                        }
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: ClientEvent) -> Option<UiExit> {
        match event {
            ClientEvent::Connecting { url, address } => {
                self.print_status("CONNECTING", &format!("{url} for {address}"));
            }
            ClientEvent::Connected { connection_id } => {
                self.print_status("CONNECTED", &format!("ID: {connection_id}"));
            }
            ClientEvent::SubscriptionSent { message } => {
                debug!("Subscription request: {}", message);
            }
            ClientEvent::SubscriptionConfirmed { subscription_id } => {
                self.print_status("LISTENING", &format!("subscription {subscription_id}"));
            }
            ClientEvent::Notification(notification) => {
                println!("{}", self.formatter.format_incoming(&notification));
                self.board.insert(notification, Instant::now());
            }
            ClientEvent::ConnectionFailed(error) => {
                info!("Connection attempt failed: {}", error);
            }
            ClientEvent::Disconnected => {
                debug!("Connection closed");
            }
            ClientEvent::Reconnecting {
                attempt,
                max_retries,
                delay,
            } => {
                self.print_status(
                    "RECONNECTING",
                    &format!(
                        "attempt {attempt}/{max_retries} in {:.1}s",
                        delay.as_secs_f64()
                    ),
                );
            }
            ClientEvent::GaveUp { retries } => {
                println!(
                    "{}",
                    self.formatter.format_status(
                        "DISCONNECTED",
                        &format!("Gave up after {retries} reconnection attempts - restart to retry")
                    )
                );
                return Some(UiExit::GaveUp);
            }
        }
        None
    }

    fn print_status(&self, status: &str, message: &str) {
        if self.quiet_mode {
            return;
        }
        println!("{}", self.formatter.format_status(status, message));
    }

    fn print_startup_banner(&self) {
        if self.quiet_mode {
            return;
        }
        let (color, reset) = if self.colored {
            (Colors::BRIGHT_CYAN, Colors::RESET)
        } else {
            ("", "")
        };
        println!();
        println!(
            "{color}CLAWSWIFT WALLET · incoming transfers · v{}{reset}",
            env!("CARGO_PKG_VERSION")
        );
        println!();
    }
}
