use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Which night ability a submission belongs to. One acting role per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NightActionKind {
    Kill,
    Save,
    Investigate,
    Shoot,
    Track,
}

/// Structured inbound event from the transport layer. Validated against
/// the current phase before it touches game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionPayload {
    NightTarget { kind: NightActionKind, target: PlayerId },
    Vote { target: PlayerId },
    Verdict { guilty: bool },
    Chat { text: String },
}
