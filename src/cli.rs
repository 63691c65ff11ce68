use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;

use hook_relay::config::{Config, DEFAULT_CONFIG_PATH};

/// Relay between agent hook processes and remote listeners
#[derive(Parser, Debug)]
#[command(name = "hook-relay")]
#[command(version)]
#[command(about = "Relay agent hook events to remote listeners and commands back")]
#[command(long_about = "hook-relay sits between a coding agent's hook processes and remote listeners.

Hooks connect to the ingestion port to publish lifecycle events and poll for
commands. Listeners connect over WebSocket to receive events and send
approve / deny / free-text commands, which the next hook poll picks up.

Quick start:
  1. Run 'hook-relay --init' to write a default config
  2. Run 'hook-relay' to start the relay
  3. Configure the agent to run 'hook-relay hook' on Stop, Notification and
     PermissionRequest events")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Write a default config file and exit
    #[arg(long)]
    pub init: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the relay server (default)
    Serve,
    /// Act as the agent's hook: read the hook event from stdin, publish it,
    /// wait for a command and print the decision
    Hook,
}

/// Write the default config unless one already exists
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file {} already exists, leaving it untouched", config_path);
        return Ok(());
    }

    Config::default()
        .save(config_path)
        .with_context(|| format!("Failed to write config to {}", config_path))?;
    println!("Created {}", config_path);
    Ok(())
}
