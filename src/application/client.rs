use std::path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Event;
use crate::domain::services::ActionApprovals;
use crate::domain::services::AuthService;
use crate::domain::services::ChatSession;
use crate::domain::services::ProviderRegistry;
use crate::domain::services::RefreshCoordinator;
use crate::domain::services::RequestPipeline;
use crate::domain::services::SessionStore;
use crate::infrastructure::api::http_client;
use crate::infrastructure::api::ApprovalsApi;
use crate::infrastructure::api::ChatsApi;
use crate::infrastructure::api::HttpAuthority;
use crate::infrastructure::api::IntegrationsApi;
use crate::infrastructure::api::WorkflowsApi;

/// Everything a command needs to talk to the server, sharing one session
/// store and one refresh coordinator.
pub struct Client {
    pub store: SessionStore,
    pub auth: AuthService,
    pub integrations: IntegrationsApi,
    pub providers: ProviderRegistry,
    pub workflows: WorkflowsApi,
    pipeline: RequestPipeline,
}

impl Client {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: SessionStore,
        events: mpsc::UnboundedSender<Event>,
    ) -> Result<Client> {
        let client = http_client(timeout)?;
        let authority = Arc::new(HttpAuthority::new(client.clone(), base_url, timeout));
        let coordinator = RefreshCoordinator::new(store.clone(), authority);
        let pipeline = RequestPipeline::new(
            client,
            base_url,
            timeout,
            store.clone(),
            coordinator,
            events,
        );

        return Ok(Client {
            store,
            auth: AuthService::new(pipeline.clone()),
            integrations: IntegrationsApi::new(pipeline.clone()),
            providers: ProviderRegistry::new(pipeline.clone()),
            workflows: WorkflowsApi::new(pipeline.clone()),
            pipeline,
        });
    }

    pub fn from_config(events: mpsc::UnboundedSender<Event>) -> Result<Client> {
        let credentials_file = path::PathBuf::from(Config::get(ConfigKey::CredentialsFile));
        let store = SessionStore::load(credentials_file)?;

        return Client::new(
            &Config::get(ConfigKey::ApiUrl),
            Config::request_timeout()?,
            store,
            events,
        );
    }

    /// Sender of the event stream the terminal printer reads.
    pub fn events(&self) -> mpsc::UnboundedSender<Event> {
        return self.pipeline.events();
    }

    pub fn chat_session(&self) -> ChatSession {
        return ChatSession::new(
            ChatsApi::new(self.pipeline.clone()),
            ActionApprovals::new(ApprovalsApi::new(self.pipeline.clone())),
            self.events(),
        );
    }
}
