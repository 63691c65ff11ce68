use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = ".hook-relay.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_ingest_addr")]
    pub ingest_addr: String,
    #[serde(default = "default_listener_addr")]
    pub listener_addr: String,
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
    #[serde(default)]
    pub hook: HookConfig,
}

/// Settings used by the `hook` subcommand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default = "default_ingest_addr")]
    pub server_addr: String,
}

fn default_ingest_addr() -> String {
    "127.0.0.1:8766".to_string()
}

fn default_listener_addr() -> String {
    "0.0.0.0:8765".to_string()
}

/// Loopback, RFC1918 private ranges, and the tailnet CGNAT / ULA ranges.
fn default_allowed_prefixes() -> Vec<String> {
    ["100.", "127.", "::1", "fd7a:", "10.", "192.168."]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            server_addr: default_ingest_addr(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest_addr: default_ingest_addr(),
            listener_addr: default_listener_addr(),
            allowed_prefixes: default_allowed_prefixes(),
            hook: HookConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config at `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.allowed_prefixes.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!("allowed_prefixes must not contain empty entries");
        }
        if self.ingest_addr == self.listener_addr {
            anyhow::bail!(
                "ingest_addr and listener_addr must differ (both are '{}')",
                self.ingest_addr
            );
        }
        Ok(())
    }
}
