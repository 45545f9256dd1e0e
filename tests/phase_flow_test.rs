use std::time::Duration;

use mafia_engine::models::action::ActionPayload;
use mafia_engine::models::config::GameConfig;
use mafia_engine::models::game::{ChatId, GamePhase};
use mafia_engine::models::role::Role;
use mafia_engine::services::{game_service, lobby_service};
use mafia_engine::state::AppState;
use mafia_engine::utils::test_setup::setup_test_env;

/// Fills a capacity-5 lobby, then pins deterministic roles while the
/// introduction grace period is still running.
async fn start_five_player_game(state: &AppState, chat: ChatId, roles: [Role; 5]) {
    lobby_service::create_game(state, chat, GameConfig::with_capacity(5))
        .await
        .unwrap();
    for i in 1..=5 {
        lobby_service::join(state, chat, i, format!("Player{}", i))
            .await
            .unwrap();
    }
    let mut games = state.games.lock().await;
    let game = games.get_mut(&chat).unwrap();
    assert_eq!(game.phase, GamePhase::Introduction);
    for (player, role) in game.players.iter_mut().zip(roles) {
        player.role = role;
    }
}

async fn phase_of(state: &AppState, chat: ChatId) -> GamePhase {
    state.games.lock().await.get(&chat).unwrap().phase
}

#[tokio::test(start_paused = true)]
async fn quiet_round_cycles_night_day_voting_and_back() {
    setup_test_env();
    let state = AppState::new();
    let chat = 400;
    start_five_player_game(
        &state,
        chat,
        [
            Role::Godfather,
            Role::Doctor,
            Role::Detective,
            Role::Sniper,
            Role::Tracker,
        ],
    )
    .await;

    // Introduction grace period (25s) runs out.
    tokio::time::sleep(Duration::from_secs(26)).await;
    assert_eq!(phase_of(&state, chat).await, GamePhase::Night);

    // Nobody acts at night (30s): nobody dies, the day opens.
    tokio::time::sleep(Duration::from_secs(30)).await;
    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert_eq!(game.phase, GamePhase::Day);
        assert_eq!(game.day_count, 1);
        assert!(game.players.iter().all(|p| p.is_alive));
    }

    // Discussion (90s) ends, voting opens.
    tokio::time::sleep(Duration::from_secs(91)).await;
    assert_eq!(phase_of(&state, chat).await, GamePhase::Voting);

    // Nobody votes (60s): no trial, straight back to night.
    tokio::time::sleep(Duration::from_secs(61)).await;
    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert_eq!(game.phase, GamePhase::Night);
        assert_eq!(game.night_count, 2);
        assert_eq!(game.defendant, None);
        assert!(game.votes.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn nomination_trial_and_elimination_flow() {
    setup_test_env();
    let state = AppState::new();
    let chat = 401;
    start_five_player_game(
        &state,
        chat,
        [
            Role::Citizen,
            Role::Godfather,
            Role::Doctor,
            Role::Detective,
            Role::Sniper,
        ],
    )
    .await;

    // Fast-forward to the voting phase.
    tokio::time::sleep(Duration::from_secs(26)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    tokio::time::sleep(Duration::from_secs(91)).await;
    assert_eq!(phase_of(&state, chat).await, GamePhase::Voting);

    // Two votes against player 1: the trial starts early, the pending
    // voting timer is left to fire as a stale no-op.
    game_service::receive_action(&state, chat, 2, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert_eq!(game.phase, GamePhase::Defense);
        assert_eq!(game.defendant, Some(1));
    }

    // Defense window (20s) ends, the verdict ballot opens.
    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(phase_of(&state, chat).await, GamePhase::FinalVote);

    game_service::receive_action(&state, chat, 2, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 4, ActionPayload::Verdict { guilty: false })
        .await
        .unwrap();

    // Ballot window (20s) closes: 2 guilty vs 1 innocent eliminates.
    tokio::time::sleep(Duration::from_secs(21)).await;
    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert!(!game.player(1).unwrap().is_alive);
        assert_eq!(game.phase, GamePhase::Night);
        assert_eq!(game.night_count, 2);
        assert_eq!(game.defendant, None);
        assert!(game.defense_votes.is_empty());
    }

    // Sleep past the stale voting timer's deadline: it must not fire a
    // second transition or reopen the vote.
    tokio::time::sleep(Duration::from_secs(61)).await;
    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert_eq!(game.phase, GamePhase::Day);
        assert_eq!(game.day_count, 2);
        assert_eq!(
            game.players.iter().filter(|p| !p.is_alive).count(),
            1,
            "no duplicate elimination"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn eliminating_the_godfather_ends_the_game() {
    setup_test_env();
    let state = AppState::new();
    let chat = 402;
    start_five_player_game(
        &state,
        chat,
        [
            Role::Godfather,
            Role::Doctor,
            Role::Detective,
            Role::Sniper,
            Role::Tracker,
        ],
    )
    .await;
    let mut rx = state.subscribe(chat).await;

    tokio::time::sleep(Duration::from_secs(26)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    tokio::time::sleep(Duration::from_secs(91)).await;

    game_service::receive_action(&state, chat, 2, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(21)).await;
    game_service::receive_action(&state, chat, 2, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(21)).await;

    // The last mafia member is gone: citizens win, the game is dropped.
    assert!(state.games.lock().await.get(&chat).is_none());

    let mut saw_game_over = false;
    while let Ok(message) = rx.try_recv() {
        if message.text.contains("Citizen team wins") {
            saw_game_over = true;
        }
    }
    assert!(saw_game_over, "winner announcement was broadcast");
}
