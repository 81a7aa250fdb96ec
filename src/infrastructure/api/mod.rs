mod approvals_api;
mod auth_api;
mod chats_api;
mod integrations_api;
mod workflows_api;

use std::time::Duration;

use anyhow::Result;

pub use approvals_api::*;
pub use auth_api::*;
pub use chats_api::*;
pub use integrations_api::*;
pub use workflows_api::*;

/// Shared HTTP client. Connection setup is bounded by `timeout`; request
/// timeouts are applied per request so streamed replies can stay open.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .user_agent(format!("agentdesk/{}", env!("CARGO_PKG_VERSION")))
        .build()?;

    return Ok(client);
}
