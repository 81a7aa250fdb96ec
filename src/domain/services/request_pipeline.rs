#[cfg(test)]
#[path = "request_pipeline_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::header;
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::RefreshCoordinator;
use super::RefreshOutcome;
use super::SessionStore;
use crate::domain::models::error_message;
use crate::domain::models::ApiRequest;
use crate::domain::models::ClientError;
use crate::domain::models::Event;
use crate::domain::models::Notice;

/// Sends every authenticated call. Attaches the current access credential,
/// renews it through the coordinator when the server answers 401, and
/// re-issues the request once. Each request that ends in an error publishes
/// exactly one notice.
#[derive(Clone)]
pub struct RequestPipeline {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    store: SessionStore,
    coordinator: RefreshCoordinator,
    events: mpsc::UnboundedSender<Event>,
}

impl RequestPipeline {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
        store: SessionStore,
        coordinator: RefreshCoordinator,
        events: mpsc::UnboundedSender<Event>,
    ) -> RequestPipeline {
        return RequestPipeline {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            store,
            coordinator,
            events,
        };
    }

    pub fn store(&self) -> &SessionStore {
        return &self.store;
    }

    pub fn events(&self) -> mpsc::UnboundedSender<Event> {
        return self.events.clone();
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let res = self.execute_quiet(request).await;
        if let Err(err) = &res {
            self.notify(err);
        }

        return res;
    }

    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        let res = self.execute(request).await?;
        match res.json::<T>().await {
            Ok(payload) => return Ok(payload),
            Err(err) => {
                let err = ClientError::from(err);
                self.notify(&err);
                return Err(err);
            }
        }
    }

    /// Same as `execute` without publishing a notice, for best effort calls
    /// whose failure the user does not need to hear about.
    pub async fn execute_quiet(&self, request: ApiRequest) -> Result<Response, ClientError> {
        let access_token = self.store.access_token();
        let res = self.send(&request, access_token.as_deref()).await?;
        if res.status() != StatusCode::UNAUTHORIZED || request.is_auth() {
            return ensure_success(res).await;
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            joining = self.coordinator.is_renewing(),
            "Access credential rejected, renewing"
        );

        match self.coordinator.renew_after(access_token.as_deref()).await {
            RefreshOutcome::Renewed => {}
            RefreshOutcome::Unavailable => {
                return Err(ClientError::SessionExpired {
                    reauthenticate: false,
                });
            }
            RefreshOutcome::Rejected | RefreshOutcome::NoCredential => {
                return Err(ClientError::SessionExpired {
                    reauthenticate: true,
                });
            }
        }

        let retried = self
            .send(&request, self.store.access_token().as_deref())
            .await?;

        return ensure_success(retried).await;
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = format!("{base}{path}", base = self.base_url, path = request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if let Some(access_token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {access_token}"));
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if !request.streaming {
            builder = builder.timeout(self.timeout);
        }

        return Ok(builder.send().await?);
    }

    fn notify(&self, err: &ClientError) {
        tracing::error!(error = ?err, "Request failed");
        if self
            .events
            .send(Event::Notice(Notice::error(&err.to_string())))
            .is_err()
        {
            tracing::debug!("Event receiver dropped, notice not delivered");
        }
    }
}

async fn ensure_success(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    return Err(ClientError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    });
}
