//! Mock market-data server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Accept connections and count them
//! - Acknowledge subscribe requests
//! - Record every text frame, tagged with the connection it arrived on
//! - Push text or gzip frames to every open connection
//! - Drop every open connection to force a reconnect

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A text frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// 1-based connection number.
    pub connection: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
enum Command {
    Send(Message),
    Drop,
}

pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    received: Arc<Mutex<Vec<Received>>>,
    connections: Arc<AtomicU32>,
    commands: broadcast::Sender<Command>,
}

impl MockWsServer {
    /// Start a server on an available port.
    pub async fn start() -> Self {
        Self::start_with_greeting(None).await
    }

    /// Start a server that sends `greeting` right after every handshake.
    pub async fn start_with_greeting(greeting: Option<Message>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received: Arc<Mutex<Vec<Received>>> = Arc::default();
        let connections = Arc::new(AtomicU32::new(0));
        let (commands, _) = broadcast::channel::<Command>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let received_clone = received.clone();
        let connections_clone = connections.clone();
        let commands_clone = commands.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let id = connections_clone.fetch_add(1, Ordering::SeqCst) + 1;
                        tokio::spawn(handle_connection(
                            stream,
                            id,
                            received_clone.clone(),
                            commands_clone.subscribe(),
                            greeting.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            received,
            connections,
            commands,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every text frame received so far, in arrival order.
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    /// Text frames received on one connection.
    pub fn received_on(&self, connection: u32) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter(|r| r.connection == connection)
            .map(|r| r.text.clone())
            .collect()
    }

    /// Subscribe requests (`sub` frames) received on one connection.
    pub fn subscriptions_on(&self, connection: u32) -> Vec<String> {
        self.received_on(connection)
            .into_iter()
            .filter(|text| text.contains("\"sub\""))
            .collect()
    }

    pub fn send_text(&self, text: &str) {
        let _ = self
            .commands
            .send(Command::Send(Message::Text(text.to_string())));
    }

    /// Send `text` gzip-compressed in a binary frame, like the exchange does.
    pub fn send_gzip(&self, text: &str) {
        let frame = huobi_ws::gzip(text.as_bytes()).unwrap();
        self.send_binary(frame);
    }

    pub fn send_binary(&self, data: Vec<u8>) {
        let _ = self.commands.send(Command::Send(Message::Binary(data)));
    }

    /// Close every open TCP connection without a Close frame.
    pub fn drop_connections(&self) {
        let _ = self.commands.send(Command::Drop);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    id: u32,
    received: Arc<Mutex<Vec<Received>>>,
    mut commands: broadcast::Receiver<Command>,
    greeting: Option<Message>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if let Some(greeting) = greeting {
        if write.send(greeting).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        received.lock().push(Received {
                            connection: id,
                            text: text.clone(),
                        });

                        // Acknowledge subscribe requests
                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
                            if let Some(sub) = parsed.get("sub") {
                                let ack = serde_json::json!({
                                    "id": parsed.get("id"),
                                    "status": "ok",
                                    "subbed": sub,
                                    "ts": 1611162033214i64
                                });
                                let _ = write.send(Message::Text(ack.to_string())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Ok(Command::Send(msg)) => {
                        if write.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(Command::Drop) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
        server.shutdown().await;
    }
}
