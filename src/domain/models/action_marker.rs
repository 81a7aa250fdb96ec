#[cfg(test)]
#[path = "action_marker_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

// Shared with the agent that writes markers into its replies.
const MARKER_OPEN: &str = "[ACTION_ID:";
const MARKER_CLOSE: char = ']';
const FIELD_SEPARATOR: char = ':';

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    /// A decision was clicked and the server has not answered yet. Controls
    /// stay disabled.
    Submitting,
    Approved,
    Rejected,
}

impl ActionStatus {
    pub fn is_final(&self) -> bool {
        return *self == ActionStatus::Approved || *self == ActionStatus::Rejected;
    }
}

/// An approve/reject request embedded in agent text as
/// `[ACTION_ID:<action id>:<action name>]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMarker {
    pub action_id: String,
    pub action_name: String,
    pub status: ActionStatus,
}

impl ActionMarker {
    pub fn new(action_id: &str, action_name: &str) -> ActionMarker {
        return ActionMarker {
            action_id: action_id.to_string(),
            action_name: action_name.to_string(),
            status: ActionStatus::Pending,
        };
    }

    /// Human readable form of the action name, `send_email` -> `send email`.
    pub fn label(&self) -> String {
        return self.action_name.replace('_', " ");
    }
}

/// The user's answer to an action request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Status the action ends in once the server confirmed the decision.
    pub fn status(&self) -> ActionStatus {
        match self {
            Decision::Approve => return ActionStatus::Approved,
            Decision::Reject => return ActionStatus::Rejected,
        }
    }

    /// Message sent as the next user turn so the agent continues.
    pub fn follow_up(&self) -> &'static str {
        match self {
            Decision::Approve => return "Approved. Please proceed.",
            Decision::Reject => return "Rejected. Do not proceed with this action.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Marker(ActionMarker),
    /// Bracketed `[ACTION_ID:...]` span that does not have both fields.
    Malformed(&'a str),
    /// Opening of a marker whose closing bracket has not arrived yet, always
    /// the last segment.
    Incomplete(&'a str),
}

/// Splits text into plain text and marker segments. A marker body is split on
/// the first separator: the id may not contain `:` and neither field may be
/// empty. The name runs up to the closing bracket and may contain `:`.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = vec![];
    let mut rest = text;

    while let Some(start) = rest.find(MARKER_OPEN) {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }

        let body_start = start + MARKER_OPEN.len();
        let Some(body_len) = rest[body_start..].find(MARKER_CLOSE) else {
            segments.push(Segment::Incomplete(&rest[start..]));
            return segments;
        };

        let body_end = body_start + body_len;
        let raw = &rest[start..body_end + MARKER_CLOSE.len_utf8()];
        match parse_body(&rest[body_start..body_end]) {
            Some(marker) => segments.push(Segment::Marker(marker)),
            None => segments.push(Segment::Malformed(raw)),
        }

        rest = &rest[body_end + MARKER_CLOSE.len_utf8()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }

    return segments;
}

fn parse_body(body: &str) -> Option<ActionMarker> {
    let (action_id, action_name) = body.split_once(FIELD_SEPARATOR)?;
    if action_id.is_empty() || action_name.is_empty() {
        return None;
    }

    return Some(ActionMarker::new(action_id, action_name));
}

pub fn markers(text: &str) -> Vec<ActionMarker> {
    return tokenize(text)
        .into_iter()
        .filter_map(|segment| {
            if let Segment::Marker(marker) = segment {
                return Some(marker);
            }
            return None;
        })
        .collect();
}

/// The marker that annotates a message. Later markers are ignored.
pub fn first_marker(text: &str) -> Option<ActionMarker> {
    return markers(text).into_iter().next();
}

/// Length of the part of a growing display text that stays visible whatever
/// arrives next. A trailing `[`, `[ACT` and the like may still turn into a
/// marker and is held back.
pub fn settled_len(display_text: &str) -> usize {
    let tail_start = display_text.len().saturating_sub(MARKER_OPEN.len() - 1);
    for (idx, _) in display_text.match_indices('[') {
        if idx >= tail_start && MARKER_OPEN.starts_with(&display_text[idx..]) {
            return idx;
        }
    }

    return display_text.len();
}

/// Text with well formed, malformed, and still-open markers removed.
pub fn strip_markers(text: &str) -> String {
    return tokenize(text)
        .into_iter()
        .filter_map(|segment| {
            if let Segment::Text(text) = segment {
                return Some(text);
            }
            return None;
        })
        .collect::<Vec<&str>>()
        .concat();
}
