use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Access and refresh credentials as issued by the auth endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub tokens: TokenPair,
    pub identity: Option<Identity>,
}

impl Session {
    pub fn new(tokens: TokenPair, identity: Option<Identity>) -> Session {
        return Session { tokens, identity };
    }

    pub fn access_token(&self) -> &str {
        return &self.tokens.access_token;
    }

    pub fn refresh_token(&self) -> &str {
        return &self.tokens.refresh_token;
    }

    /// Swaps in a new credential pair while keeping the known identity.
    pub fn rotate(&self, tokens: TokenPair) -> Session {
        return Session {
            tokens,
            identity: self.identity.clone(),
        };
    }

    pub fn with_identity(&self, identity: Identity) -> Session {
        return Session {
            tokens: self.tokens.clone(),
            identity: Some(identity),
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
