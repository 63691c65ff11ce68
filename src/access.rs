// Network-origin allow-list for listener connections

use std::net::{IpAddr, SocketAddr};

/// Classifies peer addresses against a fixed list of textual prefixes
#[derive(Debug, Clone)]
pub struct AccessControl {
    prefixes: Vec<String>,
}

impl AccessControl {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// True iff `address` starts with one of the configured prefixes
    pub fn is_allowed(&self, address: &str) -> bool {
        self.prefixes.iter().any(|p| address.starts_with(p.as_str()))
    }

    pub fn is_peer_allowed(&self, peer: &SocketAddr) -> bool {
        self.is_allowed(&peer_ip(peer))
    }
}

/// Textual IP of a peer. IPv4-mapped IPv6 addresses render as plain IPv4.
pub fn peer_ip(peer: &SocketAddr) -> String {
    match peer.ip() {
        IpAddr::V6(v6) => v6.to_canonical().to_string(),
        ip => ip.to_string(),
    }
}
