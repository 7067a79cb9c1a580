use log::{error, info, warn};
use meridian_core::Notification;
use meridian_gateway::transport::channel::DEFAULT_CAPACITY;
use meridian_gateway::{
    AdapterRegistry, Addresses, ChannelPublisher, GatewayConfig, GatewayTaskManager, PaperBridge,
    PaperExchange, Subscriber,
};
use meridian_runner::{AgentConfigFile, ControlLoop, VenueConfig};
use meridian_strategy::{CrossVenueArbitrage, CrossVenueConfig};
use std::sync::Arc;
use tokio::sync::watch;

fn print_help() {
    eprintln!(
        r#"Meridian Agent - cross-venue arbitrage control loop on paper venues

USAGE:
    meridian-agent [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run the two-venue demo
    meridian-agent

    # Run with config file
    meridian-agent --config agent.json
"#
    );
}

fn paper_venue(venue: &VenueConfig) -> PaperExchange {
    let mut exchange = PaperExchange::new(venue.exchange_id.as_str());
    for (asset, amount) in &venue.balances {
        exchange = exchange.with_balance(asset, *amount);
    }
    for ticker in &venue.tickers {
        exchange = exchange.with_ticker(&ticker.symbol, ticker.bid, ticker.ask);
    }
    if let Some(bps) = venue.random_walk_bps {
        exchange = exchange.with_random_walk(bps);
    }
    exchange
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let file = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            AgentConfigFile::from_file(&path)?
        }
        None => {
            info!("Using demo configuration");
            AgentConfigFile::demo()
        }
    };

    let mut registry = AdapterRegistry::new().with_bridge(Arc::new(PaperBridge::new()));
    for venue in &file.venues {
        registry.register(Arc::new(paper_venue(venue)))?;
    }
    let gateway_config = GatewayConfig::default().with_call_timeout(file.call_timeout());
    let gateway = Arc::new(GatewayTaskManager::new(gateway_config, registry)?);

    let strategy = CrossVenueArbitrage::new(CrossVenueConfig {
        symbol: file.symbol.clone(),
        ..CrossVenueConfig::default()
    });

    let (notifier, mut notifications) =
        ChannelPublisher::<Notification>::pair(Addresses::notifications(&file.name), DEFAULT_CAPACITY);
    tokio::spawn(async move {
        while let Ok(notification) = notifications.next().await {
            match &notification {
                Notification::Error { .. } | Notification::BridgeFailed { .. } => {
                    warn!("Notification: {:?}", notification)
                }
                _ => info!("Notification: {:?}", notification),
            }
        }
    });

    let mut control_loop = ControlLoop::new(
        file.loop_config(),
        gateway.clone(),
        Box::new(strategy),
        Box::new(notifier),
    );
    let staged = control_loop.parameter_inbox().stage_json(&file.parameters);
    if staged > 0 {
        info!("Staged {} parameter overrides", staged);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    let result = control_loop.run(shutdown_rx).await;

    let cancelled = gateway.shutdown().await;
    info!(
        "Stopped after period {} ({} tasks cancelled, {} late responses)",
        control_loop.agent().current_period,
        cancelled,
        control_loop.late_responses()
    );

    if let Err(e) = result {
        error!("Control loop failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
