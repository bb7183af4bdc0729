use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "clawswift-wallet",
    about = "incoming-transfer notifications and payment intents for the clawswift wallet",
    version
)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// File holding the wallet record
    #[arg(long, default_value = ".clawswift/wallet.json", global = true)]
    pub wallet_file: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch for incoming token transfers
    Watch(WatchArgs),
    /// Decode a scanned QR payload into a payment intent
    Scan(ScanArgs),
    /// Print the payment URI to encode in a receive QR code
    Receive(ReceiveArgs),
    /// Validate a transfer and print the request for the chain client
    Send(SendArgs),
    /// Inspect or change the stored wallet record
    #[command(subcommand)]
    Wallet(WalletCommand),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TokenArgs {
    /// ERC-20 token contract address
    #[arg(long, default_value = "0x20c0000000000000000000000000000000000000")]
    pub token: String,

    /// Token symbol used when displaying amounts
    #[arg(long, default_value = "CLAW")]
    pub symbol: String,

    /// Token decimal precision
    #[arg(long, default_value = "6")]
    pub decimals: u8,
}

#[derive(ClapArgs, Debug)]
pub struct WatchArgs {
    /// Address to watch (defaults to the stored wallet)
    #[arg(short, long)]
    pub address: Option<String>,

    /// WebSocket endpoint URL
    #[arg(short, long, default_value = "wss://exp.clawswift.net/ws")]
    pub url: String,

    #[command(flatten)]
    pub token: TokenArgs,

    /// Connection timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// First reconnection delay in milliseconds
    #[arg(long, default_value = "1000")]
    pub base_delay_ms: u64,

    /// Upper bound for the reconnection delay in milliseconds
    #[arg(long, default_value = "30000")]
    pub max_delay_ms: u64,

    /// Maximum number of reconnection attempts
    #[arg(long, default_value = "5")]
    pub max_retries: u32,

    /// Seconds a notification stays on screen
    #[arg(long, default_value = "10")]
    pub display_timeout: u64,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - notifications only
    #[arg(long)]
    pub quiet: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ScanArgs {
    /// Raw text read from the QR code
    pub payload: String,
}

#[derive(ClapArgs, Debug)]
pub struct ReceiveArgs {
    /// Receiving address (defaults to the stored wallet)
    #[arg(short, long)]
    pub address: Option<String>,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    /// Recipient address
    #[arg(long, conflicts_with = "scan")]
    pub to: Option<String>,

    /// Scanned payment URI supplying the recipient (and maybe the amount)
    #[arg(long)]
    pub scan: Option<String>,

    /// Amount in whole tokens, e.g. 2.5
    #[arg(long)]
    pub amount: Option<String>,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Show the stored wallet record
    Status,
    /// Store the address produced by the passkey connector
    Import {
        #[arg(long)]
        address: String,
        #[arg(long)]
        credential_id: String,
    },
    /// Remove the stored wallet record
    Forget,
}
