//! UI-agnostic session state: the stored passage and the dialogue history.
//!
//! Both live for one run of the program and are discarded on exit. The
//! history is append-only and always starts with the persona system turn.

use serde::{Deserialize, Serialize};

use crate::bible::VerseResult;

/// Persona/rules prompt seeding every session at position 0.
pub const SYSTEM_PROMPT: &str = "You are a scholarly educator on the Bible.

Rules:
- Do not provide spiritual guidance
- Provide context, clarification and insight into bible verses
- Always cite specific Bible verses (Book Chapter:Verse) when relevant
- Provide historical and cultural context when helpful
- Be respectful of all Christian denominations as well as other religions
- Keep responses clear and accessible
- If unsure, say so rather than making things up

Tone: Warm, thoughtful, and encouraging.";

/// The role of a chat message sender, with the wire names the completion
/// endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Builds the message list to send for one exchange: the full history,
/// with one synthetic system turn inserted at index 1 when a passage is
/// currently held. The history itself is never mutated, so calling this
/// twice with the same inputs gives the same list.
pub fn build_outbound_messages(
    history: &[ChatMessage],
    current_verse: Option<&VerseResult>,
) -> Vec<ChatMessage> {
    let mut messages = history.to_vec();
    if let Some(verse) = current_verse {
        let verse_text = verse
            .verses
            .iter()
            .map(|v| format!("{}. {}", v.verse, v.text))
            .collect::<Vec<_>>()
            .join("\n");
        let context = format!(
            "The user is currently viewing {}:\n{}",
            verse.reference, verse_text
        );
        messages.insert(1, ChatMessage::new(ChatRole::System, context));
    }
    messages
}

/// Per-session mutable state shared by the verse fetcher and the chat
/// flow. One user, one operation at a time; no locking needed.
pub struct Session {
    /// Last successful lookup. Replaced wholesale on each new success,
    /// left untouched by failures.
    pub verse: Option<VerseResult>,
    /// Append-only dialogue, seeded with exactly one system turn.
    pub messages: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            verse: None,
            messages: vec![ChatMessage::new(ChatRole::System, SYSTEM_PROMPT)],
        }
    }

    pub fn store_verse(&mut self, verse: VerseResult) {
        self.verse = Some(verse);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(ChatRole::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages
            .push(ChatMessage::new(ChatRole::Assistant, content));
    }

    /// The outbound list for the exchange being sent right now. The
    /// passage held at this moment determines the injected context for
    /// this exchange only.
    pub fn outbound_messages(&self) -> Vec<ChatMessage> {
        build_outbound_messages(&self.messages, self.verse.as_ref())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bible::VerseLine;

    fn sample_verse() -> VerseResult {
        VerseResult {
            reference: "Philippians 4:6-7".to_string(),
            verses: vec![
                VerseLine {
                    verse: 6,
                    text: "Be careful for nothing...".to_string(),
                },
                VerseLine {
                    verse: 7,
                    text: "And the peace of God...".to_string(),
                },
            ],
        }
    }

    #[test]
    fn session_starts_with_one_system_turn() {
        let session = Session::new();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, ChatRole::System);
        assert!(session.verse.is_none());
    }

    #[test]
    fn no_verse_leaves_history_unchanged() {
        let mut session = Session::new();
        session.push_user("what does this mean");
        let outbound = build_outbound_messages(&session.messages, None);
        assert_eq!(outbound, session.messages);
    }

    #[test]
    fn verse_context_is_inserted_at_index_one() {
        let mut session = Session::new();
        session.store_verse(sample_verse());
        session.push_user("what does this mean");

        let outbound = session.outbound_messages();
        assert_eq!(outbound.len(), session.messages.len() + 1);
        assert_eq!(outbound[1].role, ChatRole::System);
        assert!(outbound[1].content.contains("Philippians 4:6-7"));
        assert!(outbound[1].content.contains("6. Be careful for nothing..."));
        assert!(outbound[1].content.contains("7. And the peace of God..."));
        // the persisted history gains only the user turn
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages.last().unwrap().role, ChatRole::User);
    }

    #[test]
    fn outbound_assembly_is_idempotent() {
        let mut session = Session::new();
        session.store_verse(sample_verse());
        session.push_user("explain verse 7");
        let first = session.outbound_messages();
        let second = session.outbound_messages();
        assert_eq!(first, second);
    }

    #[test]
    fn later_lookup_changes_only_later_exchanges() {
        let mut session = Session::new();
        session.store_verse(sample_verse());
        session.push_user("first question");
        let first = session.outbound_messages();
        session.push_assistant("first answer");

        session.store_verse(VerseResult {
            reference: "John 3:16".to_string(),
            verses: vec![VerseLine {
                verse: 16,
                text: "For God so loved the world...".to_string(),
            }],
        });
        session.push_user("second question");
        let second = session.outbound_messages();

        assert!(first[1].content.contains("Philippians 4:6-7"));
        assert!(second[1].content.contains("John 3:16"));
        // the earlier assistant reply is still in the persisted history
        assert_eq!(session.messages[2].content, "first answer");
    }

    #[test]
    fn chat_roles_use_wire_names() {
        let msg = ChatMessage::new(ChatRole::Assistant, "hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        let system = serde_json::to_value(ChatMessage::new(ChatRole::System, "s")).unwrap();
        assert_eq!(system["role"], "system");
    }
}
