mod action_approvals;
mod auth;
mod chat_session;
mod oauth_providers;
mod refresh_coordinator;
mod request_pipeline;
mod session_store;

pub use action_approvals::*;
pub use auth::*;
pub use chat_session::*;
pub use oauth_providers::*;
pub use refresh_coordinator::*;
pub use request_pipeline::*;
pub use session_store::*;
