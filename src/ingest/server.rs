use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use super::handler::handle_request;
use super::protocol::decode;
use crate::relay::Relay;

/// Deadline for a hook to deliver its whole request
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest request body accepted from a hook
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Pause after a failed accept, so fd exhaustion does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP endpoint used by hook processes: one request/response per connection
pub struct IngestServer {
    listener: TcpListener,
    read_timeout: Duration,
}

impl IngestServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            read_timeout: READ_TIMEOUT,
        })
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task each
    pub async fn run(self, relay: Relay) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("hook accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let relay = relay.clone();
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                handle_connection(stream, peer, relay, read_timeout).await;
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    relay: Relay,
    read_timeout: Duration,
) {
    debug!(%peer, "hook connected");

    let bytes = match tokio::time::timeout(read_timeout, read_request(&mut stream)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!("hook read failed: {}", e);
            return;
        }
        Err(_) => {
            warn!("hook connection timed out");
            return;
        }
    };

    if bytes.is_empty() {
        return;
    }

    let (request, payload) = match decode(&bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("bad payload from hook: {}", e);
            return;
        }
    };

    let response = {
        let mut state = relay.lock().await;
        handle_request(&mut state, &request, payload)
    };

    let json = match serde_json::to_vec(&response) {
        Ok(json) => json,
        Err(e) => {
            error!("failed to serialize hook response: {}", e);
            return;
        }
    };

    if let Err(e) = write_response(&mut stream, &json).await {
        // The hook may have given up already; its command is lost either way.
        if response.command.is_some() {
            info!("hook went away before receiving its command: {}", e);
        } else {
            debug!("hook response not delivered: {}", e);
        }
    }
}

async fn write_response(stream: &mut TcpStream, json: &[u8]) -> io::Result<()> {
    stream.write_all(json).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// Read until EOF, until the bytes so far form a complete JSON value, or
/// until the byte budget is spent.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        if data.len() >= MAX_REQUEST_BYTES {
            data.truncate(MAX_REQUEST_BYTES);
            break;
        }
        if serde_json::from_slice::<serde::de::IgnoredAny>(&data).is_ok() {
            break;
        }
    }

    Ok(data)
}
