use alloy_primitives::Address;
use anyhow::{Context, Result, bail};
use clap::Parser;
use clawswift_wallet::{
    cli::{Args, Command, ReceiveArgs, ScanArgs, SendArgs, WalletCommand, WatchArgs},
    client::SubscriptionClient,
    config::{Config, token_from_args},
    events::create_event_channel,
    intent::{parse_payment_uri, payment_uri},
    monitoring::setup_metrics,
    tracing_setup::setup_tracing,
    transfer::TransferForm,
    transport::WsConnector,
    ui::{UIController, UiExit},
    wallet_store::{FileStore, WalletRecord, WalletRegistry},
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs)?;
    debug!("clawswift-wallet v{}", env!("CARGO_PKG_VERSION"));

    let registry = WalletRegistry::new(FileStore::new(&args.wallet_file));

    match args.command {
        Command::Watch(watch) => run_watch(watch, &registry).await,
        Command::Scan(scan) => run_scan(&scan),
        Command::Receive(receive) => run_receive(&receive, &registry),
        Command::Send(send) => run_send(&send),
        Command::Wallet(command) => run_wallet(command, &registry),
    }
}

fn resolve_address(explicit: Option<&str>, registry: &WalletRegistry<FileStore>) -> Result<Address> {
    if let Some(raw) = explicit {
        return Address::from_str(raw).with_context(|| format!("invalid address: {raw}"));
    }
    match registry.load()? {
        Some(record) => Ok(record.address),
        None => bail!("no wallet found; pass --address or run `wallet import` first"),
    }
}

async fn run_watch(args: WatchArgs, registry: &WalletRegistry<FileStore>) -> Result<()> {
    let address = resolve_address(args.address.as_deref(), registry)?;
    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let connector = WsConnector::new(config.websocket.timeout)?;
    let (event_sender, event_receiver) = create_event_channel();
    let mut client = SubscriptionClient::new(connector, config.clone());
    let mut ui = UIController::new(
        event_receiver,
        &config.output,
        config.notifications.display_timeout,
    );

    client.start(address, event_sender);

    let exit = tokio::select! {
        exit = ui.run() => Some(exit),
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            None
        }
    };

    client.stop();
    debug!("Final health: {}", client.health().to_json());

    match exit {
        Some(UiExit::GaveUp) => bail!(
            "gave up after {} reconnection attempts",
            config.websocket.retry.max_retries
        ),
        Some(UiExit::ChannelClosed) => {
            warn!("Event channel closed");
            Ok(())
        }
        None => Ok(()),
    }
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    match parse_payment_uri(&args.payload) {
        Some(intent) => {
            println!(
                "{}",
                serde_json::json!({
                    "recipient": intent.recipient,
                    "amount": intent.amount,
                })
            );
            Ok(())
        }
        None => bail!("payload is not a payment URI or address"),
    }
}

fn run_receive(args: &ReceiveArgs, registry: &WalletRegistry<FileStore>) -> Result<()> {
    let address = resolve_address(args.address.as_deref(), registry)?;
    let token = token_from_args(&args.token)?;
    println!("{}", payment_uri(token.contract, address));
    Ok(())
}

fn run_send(args: &SendArgs) -> Result<()> {
    let token = token_from_args(&args.token)?;
    let mut form = TransferForm::new(args.to.clone().unwrap_or_default(), String::new());

    if let Some(scanned) = &args.scan {
        let intent = parse_payment_uri(scanned)
            .with_context(|| format!("scanned payload is not a payment URI: {scanned}"))?;
        form.apply_intent(&intent);
    }
    if let Some(amount) = &args.amount {
        form.amount = amount.clone();
    }

    let request = form.validate(&token)?;
    println!("{}", request.to_json());
    Ok(())
}

fn run_wallet(command: WalletCommand, registry: &WalletRegistry<FileStore>) -> Result<()> {
    match command {
        WalletCommand::Status => match registry.load()? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("no wallet"),
        },
        WalletCommand::Import {
            address,
            credential_id,
        } => {
            let address =
                Address::from_str(&address).with_context(|| format!("invalid address: {address}"))?;
            registry.save(&WalletRecord::new(credential_id, address))?;
            info!("Stored wallet {}", address);
        }
        WalletCommand::Forget => {
            registry.forget()?;
            info!("Wallet record removed");
        }
    }
    Ok(())
}
