use tracing::warn;

use crate::models::chat::{Keyboard, MessageKind, OutboundMessage};
use crate::models::game::ChatId;
use crate::models::player::PlayerId;
use crate::state::AppState;

/// Hands one message to the transport. Delivery is fire-and-forget: a
/// failed send is logged and skipped so one unreachable player never
/// stalls the round.
pub async fn send_private(
    state: &AppState,
    chat_id: ChatId,
    recipient: PlayerId,
    kind: MessageKind,
    text: String,
    keyboard: Option<Keyboard>,
) {
    let tx = state.get_or_create_channel(chat_id).await;
    let message = OutboundMessage::new(recipient, kind, text, keyboard);
    if let Err(e) = tx.send(message) {
        warn!(chat_id, recipient, "failed to deliver message: {}", e);
    }
}

/// Fans a text out to every listed player, isolating failures per
/// recipient.
pub async fn broadcast(
    state: &AppState,
    chat_id: ChatId,
    recipients: &[PlayerId],
    kind: MessageKind,
    text: &str,
    exclude: Option<PlayerId>,
) {
    for &recipient in recipients {
        if Some(recipient) == exclude {
            continue;
        }
        send_private(state, chat_id, recipient, kind.clone(), text.to_string(), None).await;
    }
}
