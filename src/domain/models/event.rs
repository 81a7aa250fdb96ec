use super::ChatSummary;
use super::Message;
use super::TurnPhase;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: &str) -> Notice {
        return Notice {
            level: NoticeLevel::Info,
            text: text.to_string(),
        };
    }

    pub fn success(text: &str) -> Notice {
        return Notice {
            level: NoticeLevel::Success,
            text: text.to_string(),
        };
    }

    pub fn error(text: &str) -> Notice {
        return Notice {
            level: NoticeLevel::Error,
            text: text.to_string(),
        };
    }
}

/// State changes published to the UI. The UI only observes these and never
/// mutates chat state itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    ChatPromoted(String),
    ChatsLoaded(Vec<ChatSummary>),
    MessageAppended(Message),
    MessageRemoved(String),
    MessageUpdated(String, String),
    MessagesReplaced(Vec<Message>),
    Notice(Notice),
    StreamingChanged(bool),
    TurnPhaseChanged(TurnPhase),
    /// Marks a point in the stream. The printer acknowledges it once every
    /// earlier event is on screen.
    Barrier(u64),
}
