// Listener endpoint: long-lived WebSocket connections from remote clients
// that receive events and submit approve/deny/free-text commands.

pub mod handler;
pub mod protocol;
pub mod server;

pub use handler::{HISTORY_RESPONSE_EVENTS, STATE_SYNC_EVENTS, admit_listener, handle_client_message};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{CLOSE_FORBIDDEN, ListenerServer};
