pub mod game_service;
pub mod lobby_service;
pub mod phase_service;
