use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        ConnectInfo, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::handler::{admit_listener, handle_client_message};
use super::protocol::ClientMessage;
use crate::access::{AccessControl, peer_ip};
use crate::relay::Relay;

/// Close code sent to peers outside the allow-list
pub const CLOSE_FORBIDDEN: u16 = 4003;

#[derive(Clone)]
struct ListenerContext {
    relay: Relay,
    access: Arc<AccessControl>,
}

/// WebSocket endpoint for remote listeners
pub struct ListenerServer {
    listener: TcpListener,
    access: AccessControl,
}

impl ListenerServer {
    pub async fn bind(addr: impl ToSocketAddrs, access: AccessControl) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, access })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self, relay: Relay) -> io::Result<()> {
        let ctx = ListenerContext {
            relay,
            access: Arc::new(self.access),
        };
        let app = Router::new().route("/", get(ws_handler)).with_state(ctx);
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(ctx): State<ListenerContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, ctx))
}

async fn handle_socket(mut socket: WebSocket, peer: SocketAddr, ctx: ListenerContext) {
    let ip = peer_ip(&peer);

    if !ctx.access.is_peer_allowed(&peer) {
        warn!(peer = %ip, "rejected listener (not on allowed network)");
        let close = CloseFrame {
            code: CLOSE_FORBIDDEN,
            reason: "Forbidden".into(),
        };
        let _ = socket.send(Message::Close(Some(close))).await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Arc<str>>();

    let id = {
        let mut state = ctx.relay.lock().await;
        let id = admit_listener(&mut state, Box::new(outbound_tx));
        info!(peer = %ip, total = state.listeners.len(), "listener connected");
        id
    };

    // Frames queued by broadcasts and replies are written in order. When the
    // socket fails this task ends, and the dropped receiver makes the next
    // send to this listener fail, which prunes it.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
                debug!("listener send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(peer = %ip, "listener socket error: {}", e);
                break;
            }
        };

        let msg = match ClientMessage::parse(text.as_str()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(peer = %ip, "bad JSON from listener: {}", e);
                continue;
            }
        };

        let mut state = ctx.relay.lock().await;
        handle_client_message(&mut state, id, &ip, msg);
    }

    {
        let mut state = ctx.relay.lock().await;
        state.listeners.remove(id);
        info!(peer = %ip, total = state.listeners.len(), "listener disconnected");
    }
    send_task.abort();
}
