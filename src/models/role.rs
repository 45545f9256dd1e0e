use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of roles dealt at game start. Never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Godfather,
    Minion,
    Mafia,
    Doctor,
    Detective,
    Sniper,
    Tracker,
    Citizen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Mafia,
    Citizen,
}

impl Role {
    pub fn team(&self) -> Team {
        match self {
            Role::Godfather | Role::Minion | Role::Mafia => Team::Mafia,
            Role::Doctor | Role::Detective | Role::Sniper | Role::Tracker | Role::Citizen => {
                Team::Citizen
            }
        }
    }

    /// One-line description sent with the private role assignment.
    pub fn description(&self) -> &'static str {
        match self {
            Role::Godfather => "You lead the mafia and choose who dies each night.",
            Role::Minion => "You are mafia. If the Godfather dies, you take over the night kill.",
            Role::Mafia => "You are a member of the mafia team.",
            Role::Doctor => "Each night you may protect one player from being killed.",
            Role::Detective => "Each night you may learn which team one player belongs to.",
            Role::Sniper => "You may shoot at night, but two wrong shots will kill you.",
            Role::Tracker => "Each night you may watch a player and learn who they last visited.",
            Role::Citizen => "You have no night power. Vote the mafia out during the day.",
        }
    }
}

impl Team {
    pub fn emoji(&self) -> &'static str {
        match self {
            Team::Mafia => "\u{1F534}",
            Team::Citizen => "\u{1F7E2}",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Godfather => "Godfather",
            Role::Minion => "Minion",
            Role::Mafia => "Mafia",
            Role::Doctor => "Doctor",
            Role::Detective => "Detective",
            Role::Sniper => "Sniper",
            Role::Tracker => "Tracker",
            Role::Citizen => "Citizen",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Mafia => write!(f, "Mafia"),
            Team::Citizen => write!(f, "Citizen"),
        }
    }
}
