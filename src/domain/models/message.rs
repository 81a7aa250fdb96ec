#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::SecondsFormat;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

use super::first_marker;
use super::strip_markers;
use super::ActionMarker;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Author {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "sender")]
    pub author: Author,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Message {
    pub fn new(author: Author, content: &str) -> Message {
        return Message {
            id: Uuid::new_v4().to_string(),
            author,
            content: content.to_string(),
            thought: None,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
    }

    /// Empty agent message shown while a reply is on its way.
    pub fn placeholder() -> Message {
        return Message::new(Author::Agent, "");
    }

    /// Content with every inline action marker removed.
    pub fn display_text(&self) -> String {
        return strip_markers(&self.content);
    }

    /// The action this message asks the user to approve, if any. Only agent
    /// messages carry actions.
    pub fn action(&self) -> Option<ActionMarker> {
        if self.author != Author::Agent {
            return None;
        }

        return first_marker(&self.content);
    }
}
