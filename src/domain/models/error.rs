use serde_json::Value;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

fn session_expired_message(reauthenticate: bool) -> &'static str {
    if reauthenticate {
        return "Session expired. Please login again.";
    }

    return "Unable to refresh your session right now. Please try again.";
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The access credential expired and could not be renewed. When
    /// `reauthenticate` is set the session was cleared and the user has to log
    /// in again, otherwise renewal failed for transport reasons and the session
    /// was kept.
    #[error("{}", session_expired_message(*reauthenticate))]
    SessionExpired { reauthenticate: bool },

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unable to reach the server: {0}")]
    Transport(String),

    #[error("The reply stream failed: {0}")]
    Stream(String),

    #[error("Unexpected response from the server: {0}")]
    Decode(String),

    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        if let ClientError::Api { status, .. } = self {
            return Some(*status);
        }

        return None;
    }

    /// Whether the caller should send the user back to login.
    pub fn requires_login(&self) -> bool {
        return matches!(
            self,
            ClientError::SessionExpired {
                reauthenticate: true
            }
        );
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> ClientError {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }

        return ClientError::Transport(err.to_string());
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> ClientError {
        return ClientError::Decode(err.to_string());
    }
}

/// Extracts the `detail` of an error payload. The server sends either a plain
/// string or a list of validation errors with a `msg` each.
pub fn detail_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    match payload.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => {
            return Some(detail.to_string());
        }
        Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| {
                    return item.get("msg").and_then(|msg| return msg.as_str());
                })
                .collect::<Vec<&str>>();

            if messages.is_empty() {
                return None;
            }
            return Some(messages.join("; "));
        }
        _ => {
            return None;
        }
    }
}

/// Human readable message for a failed response.
pub fn error_message(body: &str) -> String {
    return detail_message(body).unwrap_or_else(|| return GENERIC_ERROR_MESSAGE.to_string());
}
