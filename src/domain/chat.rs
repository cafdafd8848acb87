use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a voice chat conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub audio_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Marks the "processing" entry shown while a turn is in flight.
    #[serde(default)]
    pub pending: bool,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>, audio_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            audio_url,
            timestamp: Utc::now(),
            pending: false,
        }
    }

    fn placeholder() -> Self {
        Self {
            pending: true,
            ..Self::new(Role::User, "Voice message sent...", None)
        }
    }
}

/// Ordered, append-only message log.
///
/// The only entry ever replaced is the pending placeholder, which is swapped
/// for the resolved messages (or removed) when the turn completes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Append a processing placeholder and return its id.
    pub fn begin_turn(&mut self) -> Uuid {
        let placeholder = ChatMessage::placeholder();
        let id = placeholder.id;
        self.messages.push(placeholder);
        id
    }

    /// Replace the placeholder with the resolved messages, keeping its position.
    pub fn resolve_turn(&mut self, placeholder: Uuid, resolved: Vec<ChatMessage>) {
        match self.position_of_pending(placeholder) {
            Some(idx) => {
                self.messages.splice(idx..=idx, resolved);
            }
            None => self.messages.extend(resolved),
        }
    }

    /// Drop the placeholder of a failed turn.
    pub fn abandon_turn(&mut self, placeholder: Uuid) {
        if let Some(idx) = self.position_of_pending(placeholder) {
            self.messages.remove(idx);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn position_of_pending(&self, id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id && m.pending)
    }
}
