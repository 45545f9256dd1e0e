use std::time::Duration;

use tracing::{error, info};

use crate::error::GameError;
use crate::models::action::{ActionPayload, NightActionKind};
use crate::models::chat::{Choice, Keyboard, MessageKind};
use crate::models::game::{ChatId, GamePhase, NightResolution, VerdictOutcome};
use crate::models::player::PlayerId;
use crate::models::role::{Role, Team};
use crate::state::AppState;
use crate::utils::messenger;

/// A private message planned while the game lock was held and sent after
/// it is released.
struct PlannedMessage {
    recipient: PlayerId,
    kind: MessageKind,
    text: String,
    keyboard: Option<Keyboard>,
}

impl PlannedMessage {
    fn private(recipient: PlayerId, text: String) -> Self {
        PlannedMessage {
            recipient,
            kind: MessageKind::Private,
            text,
            keyboard: None,
        }
    }

    fn with_keyboard(recipient: PlayerId, text: String, keyboard: Keyboard) -> Self {
        PlannedMessage {
            recipient,
            kind: MessageKind::Private,
            text,
            keyboard: Some(keyboard),
        }
    }
}

async fn flush(state: &AppState, chat_id: ChatId, planned: Vec<PlannedMessage>) {
    for message in planned {
        messenger::send_private(
            state,
            chat_id,
            message.recipient,
            message.kind,
            message.text,
            message.keyboard,
        )
        .await;
    }
}

/// Schedules the single wake-up that ends the current phase. The timer
/// captures the phase and epoch it was armed for; by the time it fires
/// the game may have moved on, in which case the wake-up is a no-op.
fn spawn_phase_timer(
    state: AppState,
    chat_id: ChatId,
    phase: GamePhase,
    epoch: u64,
    duration: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        if let Err(e) = on_timer_expired(&state, chat_id, phase, epoch).await {
            // A failed sub-effect must not take the game loop down.
            error!(chat_id, ?phase, "phase timer handler failed: {}", e);
        }
    });
}

async fn on_timer_expired(
    state: &AppState,
    chat_id: ChatId,
    phase: GamePhase,
    epoch: u64,
) -> Result<(), GameError> {
    match phase {
        GamePhase::Introduction => begin_night(state, chat_id, epoch).await,
        GamePhase::Night => end_night(state, chat_id, epoch).await,
        GamePhase::Day => begin_voting(state, chat_id, epoch).await,
        GamePhase::Voting => end_voting(state, chat_id, epoch).await,
        GamePhase::Defense => begin_final_vote(state, chat_id, epoch).await,
        GamePhase::FinalVote => end_final_vote(state, chat_id, epoch).await,
        GamePhase::Lobby | GamePhase::Ended => Ok(()),
    }
}

/// Starts a full game: deals roles, whispers them out, and arms the
/// introduction timer. Called by the lobby once capacity is reached.
pub async fn start_game(state: &AppState, chat_id: ChatId) -> Result<(), GameError> {
    let (planned, epoch, duration) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        game.assign_roles();
        game.phase = GamePhase::Introduction;
        game.epoch += 1;
        info!(chat_id, game_id = %game.game_id, "game started, roles dealt");

        let mut planned = Vec::new();
        for player in &game.players {
            let text = format!(
                "Your role: {}\nTeam: {} {}\n{}",
                player.role,
                player.team().emoji(),
                player.team(),
                player.role.description()
            );
            planned.push(PlannedMessage::private(player.id, text));
        }
        // Mafia members learn who their teammates are.
        let mafia: Vec<(PlayerId, String)> = game
            .players
            .iter()
            .filter(|p| p.team() == Team::Mafia)
            .map(|p| (p.id, p.name.clone()))
            .collect();
        if mafia.len() > 1 {
            for (id, _) in &mafia {
                let others: Vec<&str> = mafia
                    .iter()
                    .filter(|(other, _)| other != id)
                    .map(|(_, name)| name.as_str())
                    .collect();
                planned.push(PlannedMessage {
                    recipient: *id,
                    kind: MessageKind::Team,
                    text: format!("Your teammates: {}", others.join(", ")),
                    keyboard: None,
                });
            }
        }
        (planned, game.epoch, game.config.introduction_duration())
    };

    flush(state, chat_id, planned).await;
    spawn_phase_timer(
        state.clone(),
        chat_id,
        GamePhase::Introduction,
        epoch,
        duration,
    );
    Ok(())
}

/// Night falls: night-acting roles get their target keyboards.
async fn begin_night(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    let (planned, alive, night_count, new_epoch, duration) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.epoch != epoch {
            return Ok(());
        }
        game.phase = GamePhase::Night;
        game.night_count += 1;
        game.epoch += 1;

        let mut planned = Vec::new();
        let targets = |exclude: PlayerId, kind: NightActionKind| -> Keyboard {
            Keyboard::new(
                game.alive_players()
                    .filter(|p| p.id != exclude)
                    .map(|p| Choice {
                        label: p.name.clone(),
                        action: ActionPayload::NightTarget {
                            kind,
                            target: p.id,
                        },
                    })
                    .collect(),
            )
        };

        if let Some(actor) = game.kill_actor() {
            planned.push(PlannedMessage::with_keyboard(
                actor.id,
                "Choose who dies tonight.".to_string(),
                targets(actor.id, NightActionKind::Kill),
            ));
        }
        for player in game.alive_players() {
            match player.role {
                Role::Doctor => {
                    let mut keyboard = targets(player.id, NightActionKind::Save);
                    if !player.self_heal_used {
                        keyboard.choices.push(Choice {
                            label: format!("{} (you)", player.name),
                            action: ActionPayload::NightTarget {
                                kind: NightActionKind::Save,
                                target: player.id,
                            },
                        });
                    }
                    planned.push(PlannedMessage::with_keyboard(
                        player.id,
                        "Choose who to protect tonight.".to_string(),
                        keyboard,
                    ));
                }
                Role::Detective => {
                    planned.push(PlannedMessage::with_keyboard(
                        player.id,
                        "Choose who to investigate tonight.".to_string(),
                        targets(player.id, NightActionKind::Investigate),
                    ));
                }
                Role::Sniper if game.night_count > 1 => {
                    planned.push(PlannedMessage::with_keyboard(
                        player.id,
                        "Choose who to shoot, or stay silent.".to_string(),
                        targets(player.id, NightActionKind::Shoot),
                    ));
                }
                Role::Tracker => {
                    planned.push(PlannedMessage::with_keyboard(
                        player.id,
                        "Choose who to watch tonight.".to_string(),
                        targets(player.id, NightActionKind::Track),
                    ));
                }
                _ => {}
            }
        }

        let alive: Vec<PlayerId> = game.alive_players().map(|p| p.id).collect();
        (
            planned,
            alive,
            game.night_count,
            game.epoch,
            game.config.night_duration(),
        )
    };

    messenger::broadcast(
        state,
        chat_id,
        &alive,
        MessageKind::System,
        &format!("Night {} has fallen. The city sleeps.", night_count),
        None,
    )
    .await;
    flush(state, chat_id, planned).await;
    spawn_phase_timer(state.clone(), chat_id, GamePhase::Night, new_epoch, duration);
    Ok(())
}

/// Dawn: resolve the night in role order, announce deaths, and either
/// end the game or open the day.
async fn end_night(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    enum Next {
        Day {
            status: String,
            duration: Duration,
            epoch: u64,
        },
        Ended(Team),
    }

    let (resolution, planned, everyone, next) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::Night || game.epoch != epoch {
            return Ok(());
        }
        let resolution = game.resolve_night();
        let planned = night_result_messages(&resolution);
        let everyone: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();

        let next = if let Some(team) = game.check_winner() {
            Next::Ended(team)
        } else {
            game.phase = GamePhase::Day;
            game.day_count += 1;
            game.epoch += 1;
            Next::Day {
                status: game.status_text(),
                duration: game.config.day_duration(),
                epoch: game.epoch,
            }
        };
        (resolution, planned, everyone, next)
    };

    let announcement = if resolution.deaths.is_empty() {
        "The sun rises. Nobody died last night.".to_string()
    } else {
        let names: Vec<String> = resolution
            .deaths
            .iter()
            .map(|d| format!("{} ({})", d.name, d.role))
            .collect();
        format!("The sun rises. Died last night: {}", names.join(", "))
    };
    messenger::broadcast(
        state,
        chat_id,
        &everyone,
        MessageKind::System,
        &announcement,
        None,
    )
    .await;
    flush(state, chat_id, planned).await;

    match next {
        Next::Day {
            status,
            duration,
            epoch,
        } => {
            messenger::broadcast(state, chat_id, &everyone, MessageKind::System, &status, None)
                .await;
            spawn_phase_timer(state.clone(), chat_id, GamePhase::Day, epoch, duration);
        }
        Next::Ended(team) => finish_game(state, chat_id, team).await?,
    }
    Ok(())
}

/// Private follow-ups for the role actions of the night.
fn night_result_messages(resolution: &NightResolution) -> Vec<PlannedMessage> {
    let mut planned = Vec::new();
    if let Some(save) = resolution.save {
        planned.push(PlannedMessage::private(
            save.actor,
            "You stood guard over your patient tonight.".to_string(),
        ));
    }
    // The kill actor gets the same neutral notice whether or not the
    // doctor blocked the kill.
    if let Some(kill) = resolution.kill_attempt {
        planned.push(PlannedMessage::private(
            kill.actor,
            "Your target was attacked tonight.".to_string(),
        ));
    }
    if let Some(result) = &resolution.investigation {
        planned.push(PlannedMessage::private(
            result.detective,
            format!("{} is aligned with the {} team.", result.target_name, result.team),
        ));
    }
    if let Some(track) = &resolution.track {
        let text = match &track.visited_name {
            Some(visited) => format!("{} visited {} last night.", track.target_name, visited),
            None => format!("{} stayed home last night.", track.target_name),
        };
        planned.push(PlannedMessage::private(track.tracker, text));
    }
    planned
}

/// Day discussion is over; the vote opens.
async fn begin_voting(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    let (planned, alive, new_epoch, duration) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::Day || game.epoch != epoch {
            return Ok(());
        }
        game.phase = GamePhase::Voting;
        game.epoch += 1;

        let mut planned = Vec::new();
        for voter in game.alive_players() {
            let keyboard = Keyboard::new(
                game.alive_players()
                    .filter(|p| p.id != voter.id)
                    .map(|p| Choice {
                        label: p.name.clone(),
                        action: ActionPayload::Vote { target: p.id },
                    })
                    .collect(),
            );
            planned.push(PlannedMessage::with_keyboard(
                voter.id,
                "Vote for who should stand trial.".to_string(),
                keyboard,
            ));
        }
        let alive: Vec<PlayerId> = game.alive_players().map(|p| p.id).collect();
        (planned, alive, game.epoch, game.config.voting_duration())
    };

    messenger::broadcast(
        state,
        chat_id,
        &alive,
        MessageKind::System,
        "Voting has started.",
        None,
    )
    .await;
    flush(state, chat_id, planned).await;
    spawn_phase_timer(state.clone(), chat_id, GamePhase::Voting, new_epoch, duration);
    Ok(())
}

/// Moves a nominated player to trial. Called from the voting timer and,
/// as the early trigger, after every vote that could clear the
/// threshold; the epoch check makes the two race-free.
pub async fn begin_defense(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    let (defendant_name, defendant_id, everyone, new_epoch, duration) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::Voting || game.epoch != epoch {
            return Ok(());
        }
        let Some(nominee) = game.nominee() else {
            return Ok(());
        };
        game.defendant = Some(nominee);
        game.phase = GamePhase::Defense;
        game.epoch += 1;
        let name = game
            .player(nominee)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let everyone: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
        (name, nominee, everyone, game.epoch, game.config.defense_duration())
    };

    messenger::broadcast(
        state,
        chat_id,
        &everyone,
        MessageKind::System,
        &format!(
            "{} stands trial and may now speak in their defense.",
            defendant_name
        ),
        None,
    )
    .await;
    messenger::send_private(
        state,
        chat_id,
        defendant_id,
        MessageKind::Private,
        "Defend yourself. Only your messages are relayed right now.".to_string(),
        None,
    )
    .await;
    spawn_phase_timer(
        state.clone(),
        chat_id,
        GamePhase::Defense,
        new_epoch,
        duration,
    );
    Ok(())
}

/// Voting timer ran out: either a nominee stands trial or the round is
/// dropped and the next night begins.
async fn end_voting(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    // Sends the nominee to trial if the threshold is met; a no-op leaves
    // the phase and epoch untouched for the fallback below.
    begin_defense(state, chat_id, epoch).await?;

    let fallback = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::Voting || game.epoch != epoch {
            None
        } else {
            game.clear_round_state();
            game.epoch += 1;
            Some((
                game.players.iter().map(|p| p.id).collect::<Vec<_>>(),
                game.epoch,
            ))
        }
    };

    if let Some((everyone, next_epoch)) = fallback {
        messenger::broadcast(
            state,
            chat_id,
            &everyone,
            MessageKind::System,
            "Nobody was nominated. The city goes back to sleep.",
            None,
        )
        .await;
        begin_night(state, chat_id, next_epoch).await?;
    }
    Ok(())
}

/// Defense time is over; the guilty/innocent ballot opens for everyone
/// but the defendant.
async fn begin_final_vote(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    let (planned, new_epoch, duration) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::Defense || game.epoch != epoch {
            return Ok(());
        }
        game.phase = GamePhase::FinalVote;
        game.epoch += 1;

        let defendant = game.defendant;
        let keyboard = Keyboard::new(vec![
            Choice {
                label: "Guilty".to_string(),
                action: ActionPayload::Verdict { guilty: true },
            },
            Choice {
                label: "Innocent".to_string(),
                action: ActionPayload::Verdict { guilty: false },
            },
        ]);
        let planned: Vec<PlannedMessage> = game
            .alive_players()
            .filter(|p| Some(p.id) != defendant)
            .map(|p| {
                PlannedMessage::with_keyboard(
                    p.id,
                    "Cast your verdict.".to_string(),
                    keyboard.clone(),
                )
            })
            .collect();
        (planned, game.epoch, game.config.final_vote_duration())
    };

    flush(state, chat_id, planned).await;
    spawn_phase_timer(
        state.clone(),
        chat_id,
        GamePhase::FinalVote,
        new_epoch,
        duration,
    );
    Ok(())
}

/// The trial concludes: apply the verdict, check for a winner, and loop
/// back to night or finish the game.
async fn end_final_vote(state: &AppState, chat_id: ChatId, epoch: u64) -> Result<(), GameError> {
    enum Next {
        Night(u64),
        Ended(Team),
    }

    let (outcome, everyone, next) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        if game.phase != GamePhase::FinalVote || game.epoch != epoch {
            return Ok(());
        }
        let outcome = game.resolve_verdict();
        game.clear_round_state();
        let everyone: Vec<PlayerId> = game.players.iter().map(|p| p.id).collect();
        let next = if let Some(team) = game.check_winner() {
            Next::Ended(team)
        } else {
            game.epoch += 1;
            Next::Night(game.epoch)
        };
        (outcome, everyone, next)
    };

    if let Some(outcome) = &outcome {
        let text = verdict_text(outcome);
        messenger::broadcast(state, chat_id, &everyone, MessageKind::System, &text, None).await;
    }

    match next {
        Next::Night(next_epoch) => begin_night(state, chat_id, next_epoch).await,
        Next::Ended(team) => finish_game(state, chat_id, team).await,
    }
}

fn verdict_text(outcome: &VerdictOutcome) -> String {
    if outcome.eliminated {
        format!(
            "{} was found guilty ({} guilty / {} innocent) and eliminated. They were the {}.",
            outcome.defendant_name, outcome.guilty, outcome.innocent, outcome.defendant_role
        )
    } else {
        format!(
            "{} was acquitted ({} guilty / {} innocent).",
            outcome.defendant_name, outcome.guilty, outcome.innocent
        )
    }
}

/// Terminal state: announce the winner and all roles, then drop the game
/// so the chat can host a fresh lobby.
async fn finish_game(state: &AppState, chat_id: ChatId, winner: Team) -> Result<(), GameError> {
    let (reveal, everyone) = {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat_id).ok_or(GameError::GameNotFound)?;
        game.phase = GamePhase::Ended;
        game.epoch += 1;
        game.winner = Some(winner);
        info!(chat_id, game_id = %game.game_id, %winner, "game over");
        (
            game.role_reveal_text(),
            game.players.iter().map(|p| p.id).collect::<Vec<_>>(),
        )
    };

    let text = format!("Game over. The {} team wins!\n\n{}", winner, reveal);
    messenger::broadcast(state, chat_id, &everyone, MessageKind::System, &text, None).await;
    state.remove_game(chat_id).await;
    Ok(())
}
