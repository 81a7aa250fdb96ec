use std::fmt;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::Message;

/// Path segment the server accepts in place of a chat id to lazily create a
/// chat on the first message.
pub const UNSAVED_CHAT_SEGMENT: &str = "new";

/// Response header carrying the id the server assigned to a lazily created
/// chat.
pub const CHAT_ID_HEADER: &str = "x-chat-id";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChatId {
    #[default]
    Unsaved,
    Server(String),
}

impl ChatId {
    pub fn parse(text: &str) -> ChatId {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == UNSAVED_CHAT_SEGMENT {
            return ChatId::Unsaved;
        }

        return ChatId::Server(trimmed.to_string());
    }

    pub fn path_segment(&self) -> &str {
        match self {
            ChatId::Unsaved => return UNSAVED_CHAT_SEGMENT,
            ChatId::Server(id) => return id,
        }
    }

    pub fn server_id(&self) -> Option<&str> {
        match self {
            ChatId::Unsaved => return None,
            ChatId::Server(id) => return Some(id),
        }
    }

    pub fn is_unsaved(&self) -> bool {
        return *self == ChatId::Unsaved;
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.path_segment());
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_activity: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatDetail {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub last_activity: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Lifecycle of one chat turn. `Done` and `Failed` are terminal for the turn;
/// the session then goes back to `Idle`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Done,
    Failed,
}
