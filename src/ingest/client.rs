use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::protocol::{IngestRequest, IngestResponse};

/// Bound on connect, write and read for a single hook round trip
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Hook-side client for the ingestion endpoint. Each call opens a fresh
/// connection, matching the one-request-per-connection protocol.
#[derive(Debug, Clone)]
pub struct IngestClient {
    addr: String,
    timeout: Duration,
}

impl IngestClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: CLIENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and wait for the response
    pub async fn call(&self, request: &IngestRequest) -> io::Result<IngestResponse> {
        match tokio::time::timeout(self.timeout, self.round_trip(request)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "relay did not answer")),
        }
    }

    async fn round_trip(&self, request: &IngestRequest) -> io::Result<IngestResponse> {
        let mut stream = TcpStream::connect(&self.addr).await?;

        let json = serde_json::to_vec(request)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        stream.write_all(&json).await?;
        stream.shutdown().await?;

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;

        if reply.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "relay closed connection without a response",
            ));
        }

        serde_json::from_slice(&reply).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::server::IngestServer;
    use crate::relay::{Command, CommandSource, Relay};
    use tokio::net::TcpListener;

    async fn start_server() -> (Relay, String) {
        let relay = Relay::new();
        let server = IngestServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(server.run(relay.clone()));
        (relay, addr)
    }

    #[tokio::test]
    async fn client_receives_queued_command() {
        let (relay, addr) = start_server().await;
        relay
            .lock()
            .await
            .mailbox
            .push(Command::new("y", CommandSource::Approve));

        let client = IngestClient::new(addr);
        let resp = client
            .call(&IngestRequest::poll(&["approve", "deny"]))
            .await
            .unwrap();

        assert_eq!(resp.status, "ok");
        assert_eq!(resp.command.unwrap().source, CommandSource::Approve);
    }

    #[tokio::test]
    async fn client_handles_connection_refused() {
        // Bind then drop to get a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = IngestClient::new(addr).call(&IngestRequest::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn client_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = IngestClient::new(addr)
            .with_timeout(Duration::from_millis(100))
            .call(&IngestRequest::default())
            .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }
}
