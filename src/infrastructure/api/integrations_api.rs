#[cfg(test)]
#[path = "integrations_api_test.rs"]
mod tests;

use async_trait::async_trait;

use crate::domain::models::ApiRequest;
use crate::domain::models::ClientError;
use crate::domain::models::ConnectUrlResponse;
use crate::domain::models::IntegrationStatusResponse;
use crate::domain::models::OAuthProvider;
use crate::domain::models::ProviderStatus;
use crate::domain::services::RequestPipeline;

#[derive(Clone)]
pub struct IntegrationsApi {
    pipeline: RequestPipeline,
}

impl IntegrationsApi {
    pub fn new(pipeline: RequestPipeline) -> IntegrationsApi {
        return IntegrationsApi { pipeline };
    }

    pub async fn status(&self) -> Result<IntegrationStatusResponse, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::get("/integrations/status"))
            .await;
    }
}

pub struct GoogleGmail {
    pipeline: RequestPipeline,
}

impl GoogleGmail {
    pub fn new(pipeline: RequestPipeline) -> GoogleGmail {
        return GoogleGmail { pipeline };
    }
}

#[async_trait]
impl OAuthProvider for GoogleGmail {
    fn id(&self) -> &'static str {
        return "google_gmail";
    }

    fn name(&self) -> &'static str {
        return "Gmail";
    }

    #[allow(clippy::implicit_return)]
    async fn connect(&self) -> Result<String, ClientError> {
        let res: ConnectUrlResponse = self
            .pipeline
            .execute_json(ApiRequest::get("/integrations/google/connect"))
            .await?;

        return Ok(res.auth_url);
    }

    #[allow(clippy::implicit_return)]
    async fn exchange(&self, code: &str) -> Result<ProviderStatus, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::post(
                "/integrations/google/exchange",
                serde_json::json!({ "code": code }),
            ))
            .await;
    }

    #[allow(clippy::implicit_return)]
    async fn disconnect(&self) -> Result<ProviderStatus, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::delete("/integrations/google/disconnect"))
            .await;
    }
}
