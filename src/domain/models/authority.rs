use std::sync::Arc;

use async_trait::async_trait;

use super::TokenPair;

/// Why a renewal attempt did not produce a new credential pair.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenewError {
    /// The credential authority explicitly refused the refresh credential.
    /// The stored session is no longer usable.
    #[error("refresh credential rejected: {0}")]
    Rejected(String),
    /// Timeouts, connectivity loss, and server errors. Says nothing about the
    /// validity of the refresh credential.
    #[error("refresh request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait CredentialAuthority {
    /// Exchanges a refresh credential for a new access and refresh credential
    /// pair. Used by the refresh coordinator only, never by the request
    /// pipeline, so a rejected renewal cannot recurse into another renewal.
    async fn renew(&self, refresh_token: &str) -> Result<TokenPair, RenewError>;
}

pub type AuthorityBox = Arc<dyn CredentialAuthority + Send + Sync>;
