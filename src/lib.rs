// Relay core, both network endpoints and the hook-side client.
// The binary in main.rs wires them together from the config file.

pub mod access;
pub mod config;
pub mod hook;
pub mod ingest;
pub mod listener;
pub mod relay;
pub mod tailscale;
