#[cfg(test)]
#[path = "oauth_providers_test.rs"]
mod tests;

use reqwest::Url;
use tokio::sync::mpsc;

use super::RequestPipeline;
use super::SessionStore;
use crate::domain::models::ClientError;
use crate::domain::models::Event;
use crate::domain::models::Notice;
use crate::domain::models::ProviderBox;
use crate::domain::models::ProviderStatus;
use crate::infrastructure::api::GoogleGmail;

/// Where to go after a successful callback when no return URL was saved.
pub const DEFAULT_RETURN_URL: &str = "/chat/new";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Connected { provider: String, return_url: String },
    /// Carried a provider key nobody registered.
    Ignored,
    /// The URL has no `code` and `state` pair.
    NotACallback,
}

/// Every OAuth integration the client knows, keyed by the id carried in the
/// OAuth `state` parameter.
pub struct ProviderRegistry {
    providers: Vec<ProviderBox>,
    store: SessionStore,
    events: mpsc::UnboundedSender<Event>,
}

impl ProviderRegistry {
    pub fn new(pipeline: RequestPipeline) -> ProviderRegistry {
        let store = pipeline.store().clone();
        let events = pipeline.events();

        return ProviderRegistry {
            providers: vec![Box::new(GoogleGmail::new(pipeline))],
            store,
            events,
        };
    }

    pub fn providers(&self) -> &[ProviderBox] {
        return &self.providers;
    }

    pub fn get(&self, id: &str) -> Result<&ProviderBox, ClientError> {
        return self
            .providers
            .iter()
            .find(|provider| return provider.id() == id)
            .ok_or_else(|| return ClientError::UnknownProvider(id.to_string()));
    }

    /// Starts the authorization flow and returns the URL the user has to
    /// open. `return_url` is where the callback should lead back to.
    pub async fn connect(&self, id: &str, return_url: Option<&str>) -> Result<String, ClientError> {
        let provider = self.get(id)?;
        if let Some(return_url) = return_url {
            self.store.set_return_url(return_url);
        }

        return provider.connect().await;
    }

    pub async fn disconnect(&self, id: &str) -> Result<ProviderStatus, ClientError> {
        let provider = self.get(id)?;
        let status = provider.disconnect().await?;
        self.notice(Notice::success(&format!(
            "{name} disconnected",
            name = provider.name()
        )));

        return Ok(status);
    }

    /// Routes the authorization code of a redirect URL such as
    /// `/?code=...&state=google_gmail` to the provider named in `state`.
    pub async fn handle_callback(&self, url: &str) -> Result<CallbackOutcome, ClientError> {
        let Some((code, state)) = callback_params(url) else {
            return Ok(CallbackOutcome::NotACallback);
        };

        let provider = match self.get(&state) {
            Ok(provider) => provider,
            Err(err) => {
                tracing::warn!(error = ?err, "Ignoring OAuth callback");
                return Ok(CallbackOutcome::Ignored);
            }
        };

        provider.exchange(&code).await?;
        self.notice(Notice::success(&format!(
            "{name} connected successfully",
            name = provider.name()
        )));

        let return_url = self
            .store
            .take_return_url()
            .unwrap_or_else(|| return DEFAULT_RETURN_URL.to_string());

        return Ok(CallbackOutcome::Connected {
            provider: provider.name().to_string(),
            return_url,
        });
    }

    fn notice(&self, notice: Notice) {
        if self.events.send(Event::Notice(notice)).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

/// Extracts `code` and `state` from a full or path-only redirect URL.
fn callback_params(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url)
        .or_else(|_| return Url::parse("http://localhost/")?.join(url))
        .ok()?;

    let mut code = None;
    let mut state = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.to_string()),
            "state" if !value.is_empty() => state = Some(value.to_string()),
            _ => {}
        }
    }

    return Some((code?, state?));
}
