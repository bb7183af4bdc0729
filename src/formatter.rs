use crate::types::Notification;

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    // Colors
    pub const WHITE: &'static str = "\x1b[37m";
    pub const GRAY: &'static str = "\x1b[90m";

    // Bright colors
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Table,
        }
    }
}

pub struct NotificationFormatter {
    format: OutputFormat,
    colored: bool,
    count: u64,
}

impl NotificationFormatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self {
            format,
            colored,
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    fn paint(&self, color: &'static str) -> (&'static str, &'static str) {
        if self.colored {
            (color, Colors::RESET)
        } else {
            ("", "")
        }
    }

    /// Renders an incoming transfer as a single line.
    pub fn format_incoming(&mut self, notification: &Notification) -> String {
        self.count += 1;
        let local_time = notification.received_at.with_timezone(&chrono::Local);

        match self.format {
            OutputFormat::Table => {
                let (green, reset) = self.paint(Colors::BRIGHT_GREEN);
                let (gray, _) = self.paint(Colors::GRAY);
                format!(
                    "{green}[RECEIVED]{reset} +{} {} {gray}│ #{:<4} │ {} │ {}{reset}",
                    notification.display_amount(),
                    notification.token_symbol,
                    self.count,
                    local_time.format("%H:%M:%S"),
                    notification.event_id,
                )
            }
            OutputFormat::Json => serde_json::json!({
                "event": "received",
                "count": self.count,
                "event_id": notification.event_id,
                "amount": notification.amount,
                "symbol": notification.token_symbol,
                "received_at": notification.received_at,
            })
            .to_string(),
            OutputFormat::Minimal => format!(
                "{} +{} {}",
                local_time.format("%H:%M:%S"),
                notification.display_amount(),
                notification.token_symbol
            ),
        }
    }

    /// Line shown when a notification leaves the screen.
    pub fn format_expired(&self, notification: &Notification) -> Option<String> {
        match self.format {
            OutputFormat::Table => {
                let (dim, reset) = self.paint(Colors::DIM);
                Some(format!(
                    "{dim}[CLEARED] notification {}{reset}",
                    notification.event_id
                ))
            }
            OutputFormat::Json => Some(
                serde_json::json!({
                    "event": "cleared",
                    "event_id": notification.event_id,
                })
                .to_string(),
            ),
            OutputFormat::Minimal => None,
        }
    }

    /// Status indicator line: `[STATUS] symbol message`.
    pub fn format_status(&self, status: &str, message: &str) -> String {
        let (color, symbol) = match status {
            "CONNECTING" => (Colors::BRIGHT_YELLOW, "*"),
            "CONNECTED" => (Colors::BRIGHT_GREEN, "+"),
            "LISTENING" => (Colors::BRIGHT_BLUE, "~"),
            "RECONNECTING" => (Colors::BRIGHT_YELLOW, ">"),
            "DISCONNECTED" => (Colors::BRIGHT_RED, "X"),
            _ => (Colors::WHITE, "-"),
        };
        let (color, reset) = self.paint(color);
        let (bold, _) = self.paint(Colors::BOLD);
        format!("{bold}{color}[{status}]{reset} {symbol} {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification() -> Notification {
        Notification {
            event_id: "0xfeed".to_string(),
            amount: "12.345678".to_string(),
            token_symbol: "CLAW".to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn plain_table_line() {
        let mut formatter = NotificationFormatter::new(OutputFormat::Table, false);
        let line = formatter.format_incoming(&notification());
        assert!(line.starts_with("[RECEIVED] +12.3456 CLAW"));
        assert!(line.ends_with("0xfeed"));
        assert_eq!(formatter.count(), 1);
    }

    #[test]
    fn json_line_keeps_exact_amount() {
        let mut formatter = NotificationFormatter::new(OutputFormat::from("JSON"), true);
        let line = formatter.format_incoming(&notification());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["amount"], "12.345678");
        assert_eq!(value["event_id"], "0xfeed");
    }

    #[test]
    fn status_without_color() {
        let formatter = NotificationFormatter::new(OutputFormat::Minimal, false);
        assert_eq!(
            formatter.format_status("DISCONNECTED", "Reconnecting... (1/5)"),
            "[DISCONNECTED] X Reconnecting... (1/5)"
        );
        assert_eq!(formatter.format_expired(&notification()), None);
    }

    #[test]
    fn backoff_has_its_own_indicator() {
        let formatter = NotificationFormatter::new(OutputFormat::Table, false);
        assert_eq!(
            formatter.format_status("RECONNECTING", "attempt 2/5 in 2.0s"),
            "[RECONNECTING] > attempt 2/5 in 2.0s"
        );
    }
}
