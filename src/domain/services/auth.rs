#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use tokio::sync::mpsc;

use super::RequestPipeline;
use super::SessionStore;
use crate::domain::models::ApiRequest;
use crate::domain::models::ClientError;
use crate::domain::models::Event;
use crate::domain::models::Identity;
use crate::domain::models::LoginRequest;
use crate::domain::models::Notice;
use crate::domain::models::Session;
use crate::domain::models::SignupRequest;
use crate::domain::models::TokenPair;

/// Explicit session changes: login, signup, and logout. Renewal is left to
/// the refresh coordinator.
pub struct AuthService {
    pipeline: RequestPipeline,
    store: SessionStore,
    events: mpsc::UnboundedSender<Event>,
}

impl AuthService {
    pub fn new(pipeline: RequestPipeline) -> AuthService {
        let store = pipeline.store().clone();
        let events = pipeline.events();

        return AuthService {
            pipeline,
            store,
            events,
        };
    }

    pub fn is_authenticated(&self) -> bool {
        return self.store.get().is_some();
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ClientError> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let tokens: TokenPair = self
            .pipeline
            .execute_json(ApiRequest::post("/auth/login", body).auth())
            .await?;

        self.store.set(Session::new(tokens, None));
        let identity = self.fetch_profile().await?;
        self.notice(Notice::success("Login successful!"));

        return Ok(identity);
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ClientError> {
        let body = serde_json::to_value(SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let tokens: TokenPair = self
            .pipeline
            .execute_json(ApiRequest::post("/auth/signup", body).auth())
            .await?;

        self.store.set(Session::new(tokens, None));
        let identity = self.fetch_profile().await?;
        self.notice(Notice::success("Account created successfully!"));

        return Ok(identity);
    }

    /// Tells the server to revoke the refresh credential and forgets the
    /// session. The local session is cleared even when the server call fails.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.refresh_token() {
            let body = serde_json::json!({ "refresh_token": refresh_token });
            if let Err(err) = self
                .pipeline
                .execute_quiet(ApiRequest::post("/auth/logout", body).auth())
                .await
            {
                tracing::warn!(error = ?err, "Logout request failed, clearing session anyway");
            }
        }

        self.store.clear();
        self.notice(Notice::info("Logged out successfully"));
    }

    pub async fn fetch_profile(&self) -> Result<Identity, ClientError> {
        let identity: Identity = self
            .pipeline
            .execute_json(ApiRequest::get("/users/me"))
            .await?;
        self.store.set_identity(identity.clone());

        return Ok(identity);
    }

    /// Identity of a session restored from disk. Returns `None` when nobody
    /// is logged in. An expired access credential is renewed on the way.
    pub async fn restore(&self) -> Result<Option<Identity>, ClientError> {
        if self.store.get().is_none() {
            return Ok(None);
        }

        return self.fetch_profile().await.map(Some);
    }

    fn notice(&self, notice: Notice) {
        if self.events.send(Event::Notice(notice)).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}
