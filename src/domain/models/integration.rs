use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::ClientError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    pub provider: String,
    pub connected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStatusResponse {
    pub status: BTreeMap<String, IntegrationStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectUrlResponse {
    pub auth_url: String,
}

/// Answer of the exchange and disconnect endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub status: String,
}

/// An OAuth integration the user can connect. The authorization code
/// exchange itself happens on the server; the client only routes the code.
#[async_trait]
pub trait OAuthProvider {
    /// Key carried through the OAuth `state` parameter.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Returns the URL the user has to open to grant access.
    async fn connect(&self) -> Result<String, ClientError>;

    async fn exchange(&self, code: &str) -> Result<ProviderStatus, ClientError>;

    async fn disconnect(&self) -> Result<ProviderStatus, ClientError>;
}

pub type ProviderBox = Box<dyn OAuthProvider + Send + Sync>;
