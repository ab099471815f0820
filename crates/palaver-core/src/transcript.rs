//! Ordered append-only conversation history.

use crate::Message;

/// Conversation history for a single user session.
///
/// Owned by exactly one dispatcher; all mutation happens on that
/// session's synchronous request/response path, so the store itself
/// carries no locking.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Append a message, preserving insertion order.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the history with an empty sequence.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Read-only view of the full ordered history.
    #[must_use]
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_append_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("first"));
        transcript.append(Message::assistant("second"));
        transcript.append(Message::user("third"));

        let texts: Vec<&str> = transcript
            .snapshot()
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn test_turns_alternate_starting_with_user() {
        let mut transcript = Transcript::new();
        for i in 0..3 {
            transcript.append(Message::user(format!("prompt {i}")));
            transcript.append(Message::assistant(format!("reply {i}")));
        }

        assert_eq!(transcript.len(), 6);
        for (i, message) in transcript.snapshot().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
    }

    #[test]
    fn test_clear_empties_history() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("hello"));
        transcript.append(Message::assistant("hi"));
        transcript.clear();

        assert!(transcript.is_empty());
        assert!(transcript.snapshot().is_empty());
    }
}
