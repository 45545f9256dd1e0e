use tracing::debug;

use crate::error::GameError;
use crate::models::action::ActionPayload;
use crate::models::chat::MessageKind;
use crate::models::game::{ChatId, GamePhase};
use crate::models::player::PlayerId;
use crate::models::role::Team;
use crate::services::phase_service;
use crate::state::AppState;
use crate::utils::messenger;

/// Routes one inbound event from the transport into the game's critical
/// section. Rejections are echoed back to the acting player and returned
/// to the caller; game state is left unchanged on any error.
pub async fn receive_action(
    state: &AppState,
    chat_id: ChatId,
    player_id: PlayerId,
    payload: ActionPayload,
) -> Result<(), GameError> {
    let result = dispatch(state, chat_id, player_id, payload).await;
    if let Err(e) = &result {
        debug!(chat_id, player_id, "action rejected: {}", e);
        messenger::send_private(
            state,
            chat_id,
            player_id,
            MessageKind::Private,
            e.to_string(),
            None,
        )
        .await;
    }
    result
}

async fn dispatch(
    state: &AppState,
    chat_id: ChatId,
    player_id: PlayerId,
    payload: ActionPayload,
) -> Result<(), GameError> {
    match payload {
        ActionPayload::NightTarget { kind, target } => {
            {
                let mut games = state.games.lock().await;
                let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
                game.submit_night_action(player_id, kind, target)?;
            }
            messenger::send_private(
                state,
                chat_id,
                player_id,
                MessageKind::Private,
                "Target selected.".to_string(),
                None,
            )
            .await;
            Ok(())
        }
        ActionPayload::Vote { target } => {
            let threshold_epoch = {
                let mut games = state.games.lock().await;
                let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
                game.cast_vote(player_id, target)?;
                // Early trigger: the nomination check runs on every vote.
                game.nominee().map(|_| game.epoch)
            };
            if let Some(epoch) = threshold_epoch {
                phase_service::begin_defense(state, chat_id, epoch).await?;
            }
            Ok(())
        }
        ActionPayload::Verdict { guilty } => {
            let mut games = state.games.lock().await;
            let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
            game.cast_verdict(player_id, guilty)
        }
        ActionPayload::Chat { text } => relay_chat(state, chat_id, player_id, text).await,
    }
}

/// Relays a chat line according to the current phase: public talk during
/// the day and the vote, mafia-only talk at night, defendant-only talk
/// during the defense.
async fn relay_chat(
    state: &AppState,
    chat_id: ChatId,
    player_id: PlayerId,
    text: String,
) -> Result<(), GameError> {
    let (recipients, kind, line) = {
        let games = state.games.lock().await;
        let game = games.get(&chat_id).ok_or(GameError::GameNotFound)?;
        let sender = game.player(player_id).ok_or(GameError::PlayerNotFound)?;
        if !sender.is_alive {
            return Err(GameError::ActorDead);
        }
        let line = format!("{}: {}", sender.name, text);

        match game.phase {
            GamePhase::Day | GamePhase::Voting => {
                let alive: Vec<PlayerId> = game.alive_players().map(|p| p.id).collect();
                (alive, MessageKind::Public, line)
            }
            GamePhase::Night => {
                if sender.team() != Team::Mafia {
                    return Err(GameError::WrongPhase(game.phase));
                }
                let mafia: Vec<PlayerId> = game
                    .alive_players()
                    .filter(|p| p.team() == Team::Mafia)
                    .map(|p| p.id)
                    .collect();
                (mafia, MessageKind::Team, line)
            }
            GamePhase::Defense => {
                if game.defendant != Some(player_id) {
                    return Err(GameError::NotDefendant);
                }
                let everyone: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
                (everyone, MessageKind::Public, line)
            }
            phase => return Err(GameError::WrongPhase(phase)),
        }
    };

    messenger::broadcast(state, chat_id, &recipients, kind, &line, Some(player_id)).await;
    Ok(())
}
