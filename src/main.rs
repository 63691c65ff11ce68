mod cli;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, init_config};
use hook_relay::access::AccessControl;
use hook_relay::config::Config;
use hook_relay::ingest::IngestServer;
use hook_relay::listener::ListenerServer;
use hook_relay::relay::Relay;
use hook_relay::{hook, tailscale};

/// Logs go to stderr so the hook's stdout carries only its decision.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init {
        return init_config(&cli.config);
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Hook => {
            init_tracing("warn");
            // A broken config must not break the agent; fall back to defaults.
            let config = Config::load_or_default(&cli.config).unwrap_or_default();
            hook::run_from_stdin(&config.hook).await;
            Ok(())
        }
        Commands::Serve => {
            init_tracing("hook_relay=info");
            let config = Config::load_or_default(&cli.config)
                .with_context(|| format!("Failed to load config from {}", cli.config))?;
            config.validate()?;
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let relay = Relay::new();

    let ingest = IngestServer::bind(&config.ingest_addr)
        .await
        .with_context(|| format!("Failed to bind hook listener on {}", config.ingest_addr))?;
    info!("hook listener ........ tcp://{}", ingest.local_addr()?);

    let access = AccessControl::new(config.allowed_prefixes.clone());
    let listeners = ListenerServer::bind(&config.listener_addr, access)
        .await
        .with_context(|| format!("Failed to bind listener endpoint on {}", config.listener_addr))?;
    let listener_addr = listeners.local_addr()?;
    info!("listener websocket ... ws://{}", listener_addr);

    match tailscale::detect_ip().await {
        Some(ip) => {
            info!("tailscale ip ......... {}", ip);
            info!("listeners connect to . ws://{}:{}", ip, listener_addr.port());
        }
        None => warn!("tailscale not detected, listeners limited to the local network"),
    }

    info!("relay is live, waiting for events");

    let ingest_task = tokio::spawn(ingest.run(relay.clone()));
    let listener_task = tokio::spawn(listeners.run(relay));

    tokio::select! {
        result = ingest_task => {
            error!("hook listener stopped");
            result??;
        }
        result = listener_task => {
            error!("listener endpoint stopped");
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
