use serde::{Deserialize, Serialize};

use super::role::{Role, Team};

/// Opaque numeric identity assigned by the origin chat platform.
pub type PlayerId = i64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub is_alive: bool,
    // Round-scoped voting state, reset each voting round.
    pub has_voted: bool,
    pub vote_count: u32,
    // Night-scoped state, cleared after each resolution.
    pub ability_used_this_round: bool,
    pub pending_night_target: Option<PlayerId>,
    /// Who this player targeted the previous night. Read by the Tracker.
    pub last_night_target: Option<PlayerId>,
    // Role-specific persistent state.
    pub self_heal_used: bool,
    pub wrong_shot_count: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: Role::Citizen,
            is_alive: true,
            has_voted: false,
            vote_count: 0,
            ability_used_this_round: false,
            pending_night_target: None,
            last_night_target: None,
            self_heal_used: false,
            wrong_shot_count: 0,
        }
    }

    pub fn team(&self) -> Team {
        self.role.team()
    }

    /// Clears everything scoped to a single voting round.
    pub fn reset_vote_state(&mut self) {
        self.has_voted = false;
        self.vote_count = 0;
    }

    /// Clears everything scoped to a single night, preserving
    /// `last_night_target` for the Tracker.
    pub fn reset_night_state(&mut self) {
        self.ability_used_this_round = false;
        self.pending_night_target = None;
    }

    pub fn kill(&mut self) {
        self.is_alive = false;
        // A dead player never holds a pending target.
        self.pending_night_target = None;
    }
}
