#[cfg(test)]
#[path = "auth_api_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::domain::models::error_message;
use crate::domain::models::CredentialAuthority;
use crate::domain::models::RefreshRequest;
use crate::domain::models::RenewError;
use crate::domain::models::TokenPair;

/// Renews credentials against `POST /auth/refresh`. Talks to the server
/// directly rather than through the request pipeline.
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAuthority {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> HttpAuthority {
        return HttpAuthority {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        };
    }
}

#[async_trait]
impl CredentialAuthority for HttpAuthority {
    #[allow(clippy::implicit_return)]
    async fn renew(&self, refresh_token: &str) -> Result<TokenPair, RenewError> {
        let res = self
            .client
            .post(format!("{url}/auth/refresh", url = self.base_url))
            .timeout(self.timeout)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|err| return RenewError::Transport(err.to_string()))?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = res.text().await.unwrap_or_default();
            return Err(RenewError::Rejected(error_message(&body)));
        }

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Refresh endpoint failed");
            return Err(RenewError::Transport(format!(
                "refresh endpoint answered {status}"
            )));
        }

        return res
            .json::<TokenPair>()
            .await
            .map_err(|err| return RenewError::Transport(err.to_string()));
    }
}
