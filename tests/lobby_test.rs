use std::collections::HashMap;

use mafia_engine::error::GameError;
use mafia_engine::models::config::GameConfig;
use mafia_engine::models::game::GamePhase;
use mafia_engine::services::lobby_service;
use mafia_engine::state::AppState;
use mafia_engine::utils::test_setup::setup_test_env;

#[tokio::test]
async fn five_player_lobby_autostarts_with_one_role_message_each() {
    setup_test_env();
    let state = AppState::new();
    let chat = 100;
    lobby_service::create_game(&state, chat, GameConfig::with_capacity(5))
        .await
        .unwrap();
    let mut rx = state.subscribe(chat).await;

    for i in 1..=5 {
        lobby_service::join(&state, chat, i, format!("Player{}", i))
            .await
            .unwrap();
    }

    {
        let games = state.games.lock().await;
        let game = games.get(&chat).unwrap();
        assert!(game.is_started());
        assert_eq!(game.phase, GamePhase::Introduction);
        assert_eq!(game.players.len(), 5);
    }

    let mut role_messages: HashMap<i64, usize> = HashMap::new();
    while let Ok(message) = rx.try_recv() {
        if message.text.starts_with("Your role:") {
            *role_messages.entry(message.recipient).or_default() += 1;
        }
    }
    assert_eq!(role_messages.len(), 5, "every player gets a role message");
    assert!(
        role_messages.values().all(|&count| count == 1),
        "no role message is duplicated"
    );
}

#[tokio::test]
async fn duplicate_join_is_rejected_without_mutation() {
    setup_test_env();
    let state = AppState::new();
    let chat = 101;
    lobby_service::create_game(&state, chat, GameConfig::with_capacity(8))
        .await
        .unwrap();

    lobby_service::join(&state, chat, 1, "Ana".into()).await.unwrap();
    let result = lobby_service::join(&state, chat, 1, "Ana".into()).await;
    assert_eq!(result, Err(GameError::AlreadyJoined));

    let games = state.games.lock().await;
    assert_eq!(games.get(&chat).unwrap().players.len(), 1);
}

#[tokio::test]
async fn joining_a_started_game_is_rejected() {
    setup_test_env();
    let state = AppState::new();
    let chat = 102;
    lobby_service::create_game(&state, chat, GameConfig::with_capacity(5))
        .await
        .unwrap();
    for i in 1..=5 {
        lobby_service::join(&state, chat, i, format!("Player{}", i))
            .await
            .unwrap();
    }

    let result = lobby_service::join(&state, chat, 6, "Late".into()).await;
    assert_eq!(result, Err(GameError::AlreadyStarted));
}

#[tokio::test]
async fn second_lobby_in_same_chat_is_rejected() {
    setup_test_env();
    let state = AppState::new();
    let chat = 103;
    lobby_service::create_game(&state, chat, GameConfig::default())
        .await
        .unwrap();
    let result = lobby_service::create_game(&state, chat, GameConfig::default()).await;
    assert_eq!(result, Err(GameError::GameInProgress));
}

#[tokio::test]
async fn leaving_an_open_lobby_frees_the_seat() {
    setup_test_env();
    let state = AppState::new();
    let chat = 104;
    lobby_service::create_game(&state, chat, GameConfig::with_capacity(8))
        .await
        .unwrap();
    lobby_service::join(&state, chat, 1, "Ana".into()).await.unwrap();
    lobby_service::leave(&state, chat, 1).await.unwrap();

    let games = state.games.lock().await;
    assert!(games.get(&chat).unwrap().players.is_empty());
}

#[tokio::test]
async fn leaving_announces_the_updated_roster_to_remaining_members() {
    setup_test_env();
    let state = AppState::new();
    let chat = 105;
    lobby_service::create_game(&state, chat, GameConfig::with_capacity(8))
        .await
        .unwrap();
    lobby_service::join(&state, chat, 1, "Ana".into()).await.unwrap();
    lobby_service::join(&state, chat, 2, "Bela".into()).await.unwrap();

    let mut rx = state.subscribe(chat).await;
    lobby_service::leave(&state, chat, 2).await.unwrap();

    let mut saw_roster = false;
    let mut saw_departure = false;
    while let Ok(message) = rx.try_recv() {
        assert_eq!(message.recipient, 1, "only remaining members are notified");
        if message.text.contains("Players (1/8)") {
            assert!(message.text.contains("Ana"));
            assert!(!message.text.contains("Bela"));
            saw_roster = true;
        }
        if message.text.contains("Bela left the game (1/8)") {
            saw_departure = true;
        }
    }
    assert!(saw_roster, "remaining members see the new roster");
    assert!(saw_departure, "remaining members see who left");
}
