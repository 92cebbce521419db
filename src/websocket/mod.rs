//! WebSocket stream of ledger events
//!
//! Clients receive every committed event, or only those for the borrowers
//! they subscribed to.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc, RwLock};
use uuid::Uuid;

use crate::loan::{Address, EventBus, EventEnvelope};

/// WebSocket server state
#[derive(Clone)]
pub struct WsState {
    events: EventBus,
    /// Connected clients registry
    clients: Arc<RwLock<HashMap<String, ClientInfo>>>,
}

/// Client connection information
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Empty means all borrowers
    pub borrowers: HashSet<Address>,
}

impl ClientInfo {
    fn wants(&self, envelope: &EventEnvelope) -> bool {
        self.borrowers.is_empty() || self.borrowers.contains(&envelope.borrower)
    }
}

/// Client message types
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    Subscribe { borrowers: Vec<Address> },
    Unsubscribe { borrowers: Vec<Address> },
    Ping,
}

/// Server message types
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    Event { event: EventEnvelope },
    Subscribed { borrowers: Vec<Address> },
    Unsubscribed { borrowers: Vec<Address> },
    Pong,
    Error { message: String },
}

impl WsState {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn register_client(&self, client_id: String) {
        self.clients
            .write()
            .await
            .insert(client_id.clone(), ClientInfo::default());
        tracing::info!(client_id = %client_id, "Client connected");
    }

    async fn unregister_client(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
        tracing::info!(client_id = %client_id, "Client disconnected");
    }

    async fn subscribe(&self, client_id: &str, borrowers: &[Address]) {
        if let Some(client) = self.clients.write().await.get_mut(client_id) {
            client.borrowers.extend(borrowers.iter().cloned());
        }
    }

    async fn unsubscribe(&self, client_id: &str, borrowers: &[Address]) {
        if let Some(client) = self.clients.write().await.get_mut(client_id) {
            for borrower in borrowers {
                client.borrowers.remove(borrower);
            }
        }
    }

    async fn should_deliver(&self, client_id: &str, envelope: &EventEnvelope) -> bool {
        self.clients
            .read()
            .await
            .get(client_id)
            .is_some_and(|client| client.wants(envelope))
    }
}

/// WebSocket handler - upgrades HTTP connection to WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let client_id = Uuid::new_v4().to_string();
    state.register_client(client_id.clone()).await;

    let (mut sender, mut receiver) = socket.split();

    // Replies from the receive task go out through the send task
    let (internal_tx, mut internal_rx) = mpsc::channel::<ServerMessage>(32);

    let mut rx = state.events.subscribe();
    let send_state = state.clone();
    let send_client = client_id.clone();

    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                received = rx.recv() => match received {
                    Ok(envelope) => {
                        if !send_state.should_deliver(&send_client, &envelope).await {
                            continue;
                        }
                        ServerMessage::Event { event: envelope }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(client_id = %send_client, skipped, "WebSocket client lagging");
                        ServerMessage::Error {
                            message: format!("{} events dropped", skipped),
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(msg) = internal_rx.recv() => msg,
                else => break,
            };

            match serde_json::to_string(&message) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!("Failed to encode WebSocket message: {}", e),
            }
        }
    });

    let recv_state = state.clone();
    let recv_client = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { borrowers }) => {
                    recv_state.subscribe(&recv_client, &borrowers).await;
                    tracing::debug!(client_id = %recv_client, count = borrowers.len(), "Client subscribed");
                    ServerMessage::Subscribed { borrowers }
                }
                Ok(ClientMessage::Unsubscribe { borrowers }) => {
                    recv_state.unsubscribe(&recv_client, &borrowers).await;
                    tracing::debug!(client_id = %recv_client, count = borrowers.len(), "Client unsubscribed");
                    ServerMessage::Unsubscribed { borrowers }
                }
                Ok(ClientMessage::Ping) => ServerMessage::Pong,
                Err(e) => ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                },
            };

            if internal_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.unregister_client(&client_id).await;
}
