//! Turn-based Mafia game engine: lobby, role deck, day/night phase
//! machine, night-action resolution, voting and win evaluation. The
//! message transport is an external collaborator reached through
//! per-chat broadcast channels; no wire format lives here.

pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
