use mafia_engine::error::GameError;
use mafia_engine::models::action::ActionPayload;
use mafia_engine::models::config::GameConfig;
use mafia_engine::models::game::{ChatId, Game, GamePhase};
use mafia_engine::services::game_service;
use mafia_engine::state::AppState;
use mafia_engine::utils::test_setup::setup_test_env;

/// Running game parked in the voting phase, no timers armed.
async fn seed_voting_game(state: &AppState, chat: ChatId, players: usize) {
    let mut game = Game::new(chat, GameConfig::with_capacity(8));
    for i in 0..players {
        game.join(i as i64 + 1, format!("Player{}", i + 1)).unwrap();
    }
    game.phase = GamePhase::Voting;
    game.night_count = 1;
    game.day_count = 1;
    state.games.lock().await.insert(chat, game);
}

#[tokio::test]
async fn unique_max_of_two_votes_sends_the_nominee_to_trial() {
    setup_test_env();
    let state = AppState::new();
    let chat = 300;
    seed_voting_game(&state, chat, 3).await;

    // Two votes for player 1, one for player 2.
    game_service::receive_action(&state, chat, 2, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 1, ActionPayload::Vote { target: 2 })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();

    let games = state.games.lock().await;
    let game = games.get(&chat).unwrap();
    assert_eq!(game.phase, GamePhase::Defense);
    assert_eq!(game.defendant, Some(1));
}

#[tokio::test]
async fn single_vote_does_not_nominate() {
    setup_test_env();
    let state = AppState::new();
    let chat = 301;
    seed_voting_game(&state, chat, 3).await;

    game_service::receive_action(&state, chat, 2, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();

    let games = state.games.lock().await;
    let game = games.get(&chat).unwrap();
    assert_eq!(game.phase, GamePhase::Voting);
    assert_eq!(game.defendant, None);
}

#[tokio::test]
async fn revote_keeps_the_tally_consistent() {
    setup_test_env();
    let state = AppState::new();
    let chat = 302;
    seed_voting_game(&state, chat, 4).await;

    game_service::receive_action(&state, chat, 3, ActionPayload::Vote { target: 1 })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Vote { target: 2 })
        .await
        .unwrap();

    let games = state.games.lock().await;
    let game = games.get(&chat).unwrap();
    assert_eq!(game.player(1).unwrap().vote_count, 0);
    assert_eq!(game.player(2).unwrap().vote_count, 1);
    let total: u32 = game.players.iter().map(|p| p.vote_count).sum();
    assert!(total as usize <= game.players.iter().filter(|p| p.has_voted).count());
}

#[tokio::test]
async fn voting_for_a_dead_target_is_rejected() {
    setup_test_env();
    let state = AppState::new();
    let chat = 303;
    seed_voting_game(&state, chat, 3).await;
    {
        let mut games = state.games.lock().await;
        games.get_mut(&chat).unwrap().players[2].kill();
    }

    let result =
        game_service::receive_action(&state, chat, 1, ActionPayload::Vote { target: 3 }).await;
    assert_eq!(result, Err(GameError::TargetDead));
}

#[tokio::test]
async fn verdicts_are_collected_and_overwritten() {
    setup_test_env();
    let state = AppState::new();
    let chat = 304;
    seed_voting_game(&state, chat, 4).await;
    {
        let mut games = state.games.lock().await;
        let game = games.get_mut(&chat).unwrap();
        game.phase = GamePhase::FinalVote;
        game.defendant = Some(1);
    }

    game_service::receive_action(&state, chat, 2, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    game_service::receive_action(&state, chat, 3, ActionPayload::Verdict { guilty: true })
        .await
        .unwrap();
    // Changing your mind overwrites the ballot.
    game_service::receive_action(&state, chat, 3, ActionPayload::Verdict { guilty: false })
        .await
        .unwrap();
    let result =
        game_service::receive_action(&state, chat, 1, ActionPayload::Verdict { guilty: false })
            .await;
    assert_eq!(result, Err(GameError::DefendantCannotVote));

    let mut games = state.games.lock().await;
    let game = games.get_mut(&chat).unwrap();
    assert_eq!(game.defense_votes.len(), 2);

    // 1 guilty, 1 innocent: no strict majority, acquittal.
    let outcome = game.resolve_verdict().unwrap();
    assert!(!outcome.eliminated);
    assert!(game.player(1).unwrap().is_alive);
}
