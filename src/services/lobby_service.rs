use tracing::info;

use crate::error::GameError;
use crate::models::chat::MessageKind;
use crate::models::config::GameConfig;
use crate::models::game::{ChatId, Game};
use crate::models::player::PlayerId;
use crate::services::phase_service;
use crate::state::AppState;
use crate::utils::messenger;

/// Opens a fresh lobby in a chat. Rejected while another game is live.
pub async fn create_game(
    state: &AppState,
    chat_id: ChatId,
    config: GameConfig,
) -> Result<(), GameError> {
    let mut games = state.games.lock().await;
    if games.contains_key(&chat_id) {
        return Err(GameError::GameInProgress);
    }
    let game = Game::new(chat_id, config);
    info!(chat_id, game_id = %game.game_id, "lobby opened");
    games.insert(chat_id, game);
    Ok(())
}

/// Adds a player to the lobby and tells everyone about the new roster.
/// Reaching capacity starts the game automatically.
pub async fn join(
    state: &AppState,
    chat_id: ChatId,
    player_id: PlayerId,
    name: String,
) -> Result<(), GameError> {
    let (roster, members, capacity, full) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        game.join(player_id, name.clone())?;
        let members: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
        (game.roster_text(), members, game.config.capacity, game.is_full())
    };

    messenger::broadcast(state, chat_id, &members, MessageKind::System, &roster, None).await;
    let joined = format!("{} joined the game ({}/{})", name, members.len(), capacity);
    messenger::broadcast(
        state,
        chat_id,
        &members,
        MessageKind::System,
        &joined,
        Some(player_id),
    )
    .await;

    if full {
        phase_service::start_game(state, chat_id).await?;
    }
    Ok(())
}

/// Removes a player from a lobby that has not started yet and shows the
/// remaining members the updated roster.
pub async fn leave(
    state: &AppState,
    chat_id: ChatId,
    player_id: PlayerId,
) -> Result<(), GameError> {
    let (roster, members, name, capacity) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        let index = game
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotFound)?;
        let departed = game.players.remove(index);
        let members: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
        (
            game.roster_text(),
            members,
            departed.name,
            game.config.capacity,
        )
    };

    messenger::broadcast(state, chat_id, &members, MessageKind::System, &roster, None).await;
    let left = format!("{} left the game ({}/{})", name, members.len(), capacity);
    messenger::broadcast(state, chat_id, &members, MessageKind::System, &left, None).await;
    Ok(())
}
