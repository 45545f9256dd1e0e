use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionPayload;
use super::player::PlayerId;

/// A message the engine asks the transport to deliver to one player.
/// Broadcasts are fanned out into one of these per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message_id: String,
    pub recipient: PlayerId,
    pub kind: MessageKind,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MessageKind {
    /// Day-time talk and announcements everyone may see.
    Public,
    /// Mafia-only night chat.
    Team,
    /// Role assignments, ability results, rejection notices.
    Private,
    System,
}

/// Tappable choice set attached to a message. Each choice carries the
/// structured action the tap should produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyboard {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub action: ActionPayload,
}

impl OutboundMessage {
    pub fn new(
        recipient: PlayerId,
        kind: MessageKind,
        text: String,
        keyboard: Option<Keyboard>,
    ) -> Self {
        OutboundMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            recipient,
            kind,
            text,
            keyboard,
            timestamp: Utc::now(),
        }
    }
}

impl Keyboard {
    pub fn new(choices: Vec<Choice>) -> Self {
        Keyboard { choices }
    }
}
