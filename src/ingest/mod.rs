// Ingestion endpoint: short-lived TCP connections from hook processes.
// Each connection carries one JSON request and gets at most one JSON reply.

pub mod client;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::IngestClient;
pub use handler::handle_request;
pub use protocol::{IngestRequest, IngestResponse, RequestKind};
pub use server::IngestServer;
