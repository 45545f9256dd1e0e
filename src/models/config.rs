use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-game rule settings. Fixed once the game is created; the phase
/// controller reads the durations, the deck builder reads the counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub capacity: usize,
    /// Number of mafia-aligned roles in the deck (1 Godfather, then a
    /// Minion, then plain Mafia).
    pub mafia_count: usize,
    pub introduction_secs: u64,
    pub night_secs: u64,
    pub day_secs: u64,
    pub voting_secs: u64,
    pub defense_secs: u64,
    pub final_vote_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        let capacity = 8;
        Self {
            capacity,
            mafia_count: Self::default_mafia_count(capacity),
            introduction_secs: 25,
            night_secs: 30,
            day_secs: 90,
            voting_secs: 60,
            defense_secs: 20,
            final_vote_secs: 20,
        }
    }
}

impl GameConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            mafia_count: Self::default_mafia_count(capacity),
            ..Self::default()
        }
    }

    /// One mafia for every four seats, never fewer than one.
    fn default_mafia_count(capacity: usize) -> usize {
        (capacity / 4).max(1)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(capacity) = read_env("MAFIA_CAPACITY") {
            config.capacity = capacity as usize;
            config.mafia_count = Self::default_mafia_count(config.capacity);
        }
        if let Some(count) = read_env("MAFIA_COUNT") {
            config.mafia_count = count as usize;
        }
        if let Some(secs) = read_env("MAFIA_INTRODUCTION_SECS") {
            config.introduction_secs = secs;
        }
        if let Some(secs) = read_env("MAFIA_NIGHT_SECS") {
            config.night_secs = secs;
        }
        if let Some(secs) = read_env("MAFIA_DAY_SECS") {
            config.day_secs = secs;
        }
        if let Some(secs) = read_env("MAFIA_VOTING_SECS") {
            config.voting_secs = secs;
        }
        if let Some(secs) = read_env("MAFIA_DEFENSE_SECS") {
            config.defense_secs = secs;
        }
        if let Some(secs) = read_env("MAFIA_FINAL_VOTE_SECS") {
            config.final_vote_secs = secs;
        }
        config
    }

    pub fn introduction_duration(&self) -> Duration {
        Duration::from_secs(self.introduction_secs)
    }

    pub fn night_duration(&self) -> Duration {
        Duration::from_secs(self.night_secs)
    }

    pub fn day_duration(&self) -> Duration {
        Duration::from_secs(self.day_secs)
    }

    pub fn voting_duration(&self) -> Duration {
        Duration::from_secs(self.voting_secs)
    }

    pub fn defense_duration(&self) -> Duration {
        Duration::from_secs(self.defense_secs)
    }

    pub fn final_vote_duration(&self) -> Duration {
        Duration::from_secs(self.final_vote_secs)
    }
}

fn read_env(var: &str) -> Option<u64> {
    env::var(var).ok().and_then(|v| v.parse::<u64>().ok())
}
