use std::{collections::HashMap, sync::Arc};

use tokio::sync::{broadcast, Mutex};

use crate::models::chat::OutboundMessage;
use crate::models::game::{ChatId, Game};

/// Shared state for every game hosted by the process. Games are keyed by
/// origin chat id and fully independent of each other; the registry
/// mutex is the critical section for all game mutation.
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<Mutex<HashMap<ChatId, Game>>>,
    pub channels: Arc<Mutex<HashMap<ChatId, broadcast::Sender<OutboundMessage>>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            games: Arc::new(Mutex::new(HashMap::new())),
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Outbound channel for one chat, created lazily. The transport layer
    /// subscribes to deliver messages to players.
    pub async fn get_or_create_channel(&self, chat_id: ChatId) -> broadcast::Sender<OutboundMessage> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(&chat_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(1000);
            channels.insert(chat_id, tx.clone());
            tx
        }
    }

    pub async fn subscribe(&self, chat_id: ChatId) -> broadcast::Receiver<OutboundMessage> {
        self.get_or_create_channel(chat_id).await.subscribe()
    }

    /// Drops a finished game so the chat can host a fresh lobby.
    pub async fn remove_game(&self, chat_id: ChatId) -> Option<Game> {
        self.games.lock().await.remove(&chat_id)
    }
}
