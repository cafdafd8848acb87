use tracing::{info, warn};

use crate::api::ApiClient;
use crate::domain::{
    AudioClip, ChatMessage, ChatTurn, Conversation, Notice, Role,
};

/// Workflow label used in chat notices.
pub const CHAT_WORKFLOW: &str = "Chat";

/// State behind the voice chat panel: the conversation log and the voice the
/// assistant answers with.
///
/// A failed turn removes its placeholder and leaves every earlier message
/// untouched; the selected voice is kept so the user can simply retry.
pub struct ChatSession {
    api: ApiClient,
    voice_id: String,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(api: ApiClient, voice_id: impl Into<String>) -> Self {
        Self {
            api,
            voice_id: voice_id.into(),
            conversation: Conversation::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn set_voice_id(&mut self, voice_id: impl Into<String>) {
        self.voice_id = voice_id.into();
    }

    /// Send one recorded utterance and append the exchange to the log.
    ///
    /// On failure the error is returned as a ready-to-show notice.
    pub async fn send(&mut self, clip: &AudioClip) -> Result<ChatTurn, Notice> {
        let placeholder = self.conversation.begin_turn();

        match self.api.voice_chat(clip, &self.voice_id).await {
            Ok(turn) => {
                let mut resolved = Vec::with_capacity(2);
                if !turn.reply.user_text.is_empty() {
                    resolved.push(ChatMessage::new(Role::User, turn.reply.user_text.clone(), None));
                }
                // A local handle stays with the returned turn; only hosted
                // audio is referenced from the log.
                resolved.push(ChatMessage::new(
                    Role::Assistant,
                    turn.reply.ai_text.clone(),
                    turn.reply.audio_url.clone(),
                ));
                self.conversation.resolve_turn(placeholder, resolved);

                info!(messages = self.conversation.len(), "Chat turn added");
                Ok(turn)
            }
            Err(e) => {
                self.conversation.abandon_turn(placeholder);
                warn!(error = %e, "Chat turn failed");
                Err(Notice::failure(CHAT_WORKFLOW, &e))
            }
        }
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
    }
}
