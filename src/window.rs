//! Bounded context window over the adapter's in-memory history.

use crate::history::ChatMessage;

/// Number of history entries forwarded to the model on each request.
pub const HISTORY_WINDOW: usize = 16;

/// Trims `messages` in place to the most recent `window` entries,
/// discarding the oldest first. A plain FIFO truncation, not a summary.
pub fn trim_to_window(messages: &mut Vec<ChatMessage>, window: usize) {
    if messages.len() > window {
        let excess = messages.len() - window;
        messages.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;

    fn numbered(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| ChatMessage::new(Role::User, format!("m{i}")))
            .collect()
    }

    #[test]
    fn under_window_is_untouched() {
        let mut messages = numbered(5);
        trim_to_window(&mut messages, HISTORY_WINDOW);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].content, "m0");
    }

    #[test]
    fn exact_window_is_untouched() {
        let mut messages = numbered(HISTORY_WINDOW);
        trim_to_window(&mut messages, HISTORY_WINDOW);
        assert_eq!(messages.len(), HISTORY_WINDOW);
    }

    #[test]
    fn oldest_entries_are_discarded_first() {
        let mut messages = numbered(20);
        trim_to_window(&mut messages, HISTORY_WINDOW);
        assert_eq!(messages.len(), HISTORY_WINDOW);
        assert_eq!(messages[0].content, "m4");
        assert_eq!(messages.last().unwrap().content, "m19");
    }
}
