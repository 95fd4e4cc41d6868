use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::api::handlers::AppState;
use crate::services::{LiveUpdate, PortfolioSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    SubscribeMint { mint: String },
    UnsubscribeMint { mint: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage<'a> {
    Connected { message: String },
    LiveUpdate(&'a LiveUpdate),
    Portfolio(&'a PortfolioSnapshot),
    Error { message: String },
}

impl WsMessage<'_> {
    fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                error!("Failed to encode websocket message: {}", e);
                None
            }
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| websocket_handler(socket, state))
}

async fn websocket_handler(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();

    // Wrap sender in Arc<Mutex> so it can be shared safely
    let sender = Arc::new(Mutex::new(sender));

    let mut live_rx = state.tracker.subscribe();
    let mut portfolio_rx = state.portfolio.subscribe();

    info!("WebSocket client connected");

    // Track subscribed mints; empty means every mint
    let subscribed_mints: Arc<RwLock<HashSet<String>>> = Arc::new(RwLock::new(HashSet::new()));

    // Send welcome message plus the current portfolio
    {
        let mut sender_lock = sender.lock().await;
        let welcome = WsMessage::Connected {
            message: "Connected to Paper Trader".to_string(),
        };
        let current = state.portfolio.current();
        for frame in [welcome.to_frame(), WsMessage::Portfolio(&current).to_frame()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = sender_lock.send(frame).await {
                error!("Failed to send welcome message: {}", e);
                return;
            }
        }
    }

    // Task to handle incoming client messages
    let recv_sender = Arc::clone(&sender);
    let recv_subscriptions = Arc::clone(&subscribed_mints);
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(ClientCommand::SubscribeMint { mint }) => {
                        info!("Client subscribed to mint: {}", mint);
                        recv_subscriptions.write().await.insert(mint);
                    }
                    Ok(ClientCommand::UnsubscribeMint { mint }) => {
                        info!("Client unsubscribed from mint: {}", mint);
                        recv_subscriptions.write().await.remove(&mint);
                    }
                    Err(e) => {
                        let reply = WsMessage::Error {
                            message: format!("Invalid command: {}", e),
                        };
                        if let Some(frame) = reply.to_frame() {
                            if let Err(e) = recv_sender.lock().await.send(frame).await {
                                error!("Failed to send error message: {}", e);
                                break;
                            }
                        }
                    }
                },
                Message::Close(_) => {
                    info!("Client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    // Task to push live updates (filtered by subscribed mints) and portfolio snapshots
    let send_sender = Arc::clone(&sender);
    let send_subscriptions = Arc::clone(&subscribed_mints);
    let send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Ok(update) = live_rx.recv() => {
                    let subs = send_subscriptions.read().await;
                    if !subs.is_empty() && !subs.contains(&update.mint) {
                        continue;
                    }
                    WsMessage::LiveUpdate(&update).to_frame()
                },
                Ok(()) = portfolio_rx.changed() => {
                    let snapshot = Arc::clone(&portfolio_rx.borrow_and_update());
                    WsMessage::Portfolio(&snapshot).to_frame()
                },
                else => break,
            };

            if let Some(frame) = frame {
                if let Err(e) = send_sender.lock().await.send(frame).await {
                    warn!("Failed to push update: {}", e);
                    break;
                }
            }
        }
    });

    // Pin the tasks
    tokio::pin!(recv_task);
    tokio::pin!(send_task);

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    info!("WebSocket connection closed");
}
