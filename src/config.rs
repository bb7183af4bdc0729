/// file: src/config.rs
/// description: Configuration for the transfer watcher, mapped from CLI arguments
use crate::{
    cli::{TokenArgs, WatchArgs},
    client_state::RetryPolicy,
    formatter::OutputFormat,
    types::Token,
};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub websocket: WebSocketConfig,
    pub token: Token,
    pub notifications: NotificationConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub display_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
}

impl Config {
    /// Defaults for everything but the endpoint.
    pub fn new(url: Url) -> Self {
        Self {
            websocket: WebSocketConfig {
                url,
                timeout: Duration::from_secs(30),
                retry: RetryPolicy::default(),
            },
            token: Token::default(),
            notifications: NotificationConfig {
                display_timeout: crate::notifications::DEFAULT_DISPLAY_TIMEOUT,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 9090,
            },
            output: OutputConfig {
                format: OutputFormat::Table,
                colored: true,
                quiet: false,
            },
        }
    }

    pub fn from_args(args: &WatchArgs) -> Result<Self> {
        let url = Url::parse(&args.url)?;
        if args.base_delay_ms > args.max_delay_ms {
            anyhow::bail!(
                "base delay ({}ms) exceeds max delay ({}ms)",
                args.base_delay_ms,
                args.max_delay_ms
            );
        }

        Ok(Config {
            websocket: WebSocketConfig {
                url,
                timeout: Duration::from_secs(args.timeout),
                retry: RetryPolicy {
                    base_delay: Duration::from_millis(args.base_delay_ms),
                    max_delay: Duration::from_millis(args.max_delay_ms),
                    max_retries: args.max_retries,
                },
            },
            token: token_from_args(&args.token)?,
            notifications: NotificationConfig {
                display_timeout: Duration::from_secs(args.display_timeout),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            output: OutputConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
                quiet: args.quiet,
            },
        })
    }
}

pub fn token_from_args(args: &TokenArgs) -> Result<Token> {
    let contract = Address::from_str(&args.token)
        .with_context(|| format!("invalid token contract address: {}", args.token))?;
    Ok(Token {
        contract,
        symbol: args.symbol.clone(),
        decimals: args.decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, Command};
    use clap::Parser;

    fn watch_args(extra: &[&str]) -> WatchArgs {
        let argv = ["clawswift-wallet", "watch"].iter().chain(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Watch(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_match_retry_policy() {
        let config = Config::from_args(&watch_args(&[])).unwrap();
        assert_eq!(config.websocket.retry, RetryPolicy::default());
        assert_eq!(config.websocket.url.as_str(), "wss://exp.clawswift.net/ws");
        assert_eq!(config.token, Token::default());
        assert_eq!(
            config.notifications.display_timeout,
            crate::notifications::DEFAULT_DISPLAY_TIMEOUT
        );
    }

    #[test]
    fn rejects_inverted_delays() {
        let args = watch_args(&["--base-delay-ms", "5000", "--max-delay-ms", "1000"]);
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn rejects_bad_token_address() {
        let args = watch_args(&["--token", "0x1234"]);
        assert!(Config::from_args(&args).is_err());
    }
}
