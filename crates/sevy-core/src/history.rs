//! Conversation-history normalization.
//!
//! The front-end has shipped two request shapes over time: a legacy single
//! `message` string and the multi-turn `messages` array. Both are reconciled
//! here into one canonical window before anything else sees them.

use crate::types::Message;

/// Reconcile the two request shapes into a canonical conversation window,
/// bounded to the trailing `limit` turns.
///
/// A non-empty `turns` array wins; the entries are used as-is (the caller
/// owns role correctness and ordering). Otherwise a non-blank legacy
/// `message` is wrapped as a single user turn. Returns `None` when neither
/// field yields content, in which case the caller answers with the sentinel
/// reply instead of invoking the completion path.
pub fn normalize(
    turns: Option<&[Message]>,
    legacy: Option<&str>,
    limit: usize,
) -> Option<Vec<Message>> {
    let window = match turns {
        Some(turns) if !turns.is_empty() => turns.to_vec(),
        _ => {
            let message = legacy?.trim();
            if message.is_empty() {
                return None;
            }
            vec![Message::user(message)]
        }
    };

    Some(truncate_window(window, limit))
}

/// Keep only the trailing `limit` turns, discarding the oldest first.
/// Recent context is what matters; the bound keeps upstream request size
/// and cost flat no matter how long the widget conversation runs.
fn truncate_window(mut window: Vec<Message>, limit: usize) -> Vec<Message> {
    if window.len() > limit {
        window.drain(..window.len() - limit);
    }
    window
}
