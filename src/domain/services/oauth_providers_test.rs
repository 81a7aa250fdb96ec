use anyhow::Result;
use tokio::sync::mpsc;

use super::callback_params;
use super::CallbackOutcome;
use super::ProviderRegistry;
use super::DEFAULT_RETURN_URL;
use crate::domain::models::ClientError;
use crate::domain::models::Event;
use crate::domain::models::Notice;
use crate::domain::models::Session;
use crate::domain::models::TokenPair;
use crate::domain::services::RequestPipeline;
use crate::domain::services::SessionStore;

fn registry(url: &str) -> (ProviderRegistry, SessionStore, mpsc::UnboundedReceiver<Event>) {
    let store = SessionStore::in_memory();
    store.set(Session::new(
        TokenPair {
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
        },
        None,
    ));

    let (pipeline, rx) = RequestPipeline::with_url(url, store.clone());
    return (ProviderRegistry::new(pipeline), store, rx);
}

#[test]
fn it_reads_callback_params() {
    assert_eq!(
        callback_params("http://localhost:5173/?code=abc&state=google_gmail"),
        Some(("abc".to_string(), "google_gmail".to_string()))
    );
    assert_eq!(
        callback_params("/?state=google_gmail&code=a%2Fb"),
        Some(("a/b".to_string(), "google_gmail".to_string()))
    );
    assert_eq!(callback_params("/?code=abc"), None);
    assert_eq!(callback_params("/?code=&state=google_gmail"), None);
    assert_eq!(callback_params("/chat/new"), None);
}

#[test]
fn it_rejects_unknown_providers() {
    let (registry, _store, _rx) = registry("http://127.0.0.1:9");

    assert_eq!(registry.get("google_gmail").unwrap().name(), "Gmail");
    assert!(matches!(
        registry.get("twitter"),
        Err(ClientError::UnknownProvider(id)) if id == "twitter"
    ));
}

#[tokio::test]
async fn it_routes_the_code_to_the_provider() -> Result<()> {
    let mut server = mockito::Server::new();
    let exchange = server
        .mock("POST", "/integrations/google/exchange")
        .match_body(mockito::Matcher::Json(serde_json::json!({"code": "abc"})))
        .with_status(200)
        .with_body(r#"{"provider":"google_gmail","status":"connected"}"#)
        .create();

    let (registry, store, mut rx) = registry(&server.url());
    store.set_return_url("/chat/0f8b7c2e");

    let outcome = registry
        .handle_callback("http://localhost:5173/?code=abc&state=google_gmail")
        .await?;

    assert_eq!(
        outcome,
        CallbackOutcome::Connected {
            provider: "Gmail".to_string(),
            return_url: "/chat/0f8b7c2e".to_string(),
        }
    );
    assert_eq!(store.take_return_url(), None);
    assert_eq!(
        rx.try_recv()?,
        Event::Notice(Notice::success("Gmail connected successfully"))
    );
    exchange.assert();

    return Ok(());
}

#[tokio::test]
async fn it_falls_back_to_a_new_chat() -> Result<()> {
    let mut server = mockito::Server::new();
    let _exchange = server
        .mock("POST", "/integrations/google/exchange")
        .with_status(200)
        .with_body(r#"{"provider":"google_gmail","status":"connected"}"#)
        .create();

    let (registry, _store, _rx) = registry(&server.url());
    let outcome = registry
        .handle_callback("/?code=abc&state=google_gmail")
        .await?;

    assert!(matches!(
        outcome,
        CallbackOutcome::Connected { return_url, .. } if return_url == DEFAULT_RETURN_URL
    ));

    return Ok(());
}

#[tokio::test]
async fn it_ignores_callbacks_for_unknown_providers() -> Result<()> {
    let mut server = mockito::Server::new();
    let exchange = server
        .mock("POST", "/integrations/google/exchange")
        .expect(0)
        .create();

    let (registry, store, mut rx) = registry(&server.url());
    store.set_return_url("/chat/0f8b7c2e");

    let outcome = registry
        .handle_callback("/?code=abc&state=twitter")
        .await?;

    assert_eq!(outcome, CallbackOutcome::Ignored);
    assert!(rx.try_recv().is_err());
    assert_eq!(store.take_return_url(), Some("/chat/0f8b7c2e".to_string()));
    exchange.assert();

    return Ok(());
}

#[tokio::test]
async fn it_keeps_the_return_url_when_the_exchange_fails() {
    let mut server = mockito::Server::new();
    let exchange = server
        .mock("POST", "/integrations/google/exchange")
        .with_status(400)
        .with_body(r#"{"detail":"Invalid authorization code"}"#)
        .create();

    let (registry, store, mut rx) = registry(&server.url());
    store.set_return_url("/chat/0f8b7c2e");

    let res = registry
        .handle_callback("/?code=stale&state=google_gmail")
        .await;

    assert_eq!(res.unwrap_err().to_string(), "Invalid authorization code");
    assert_eq!(
        rx.try_recv().unwrap(),
        Event::Notice(Notice::error("Invalid authorization code"))
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(store.take_return_url(), Some("/chat/0f8b7c2e".to_string()));
    exchange.assert();
}

#[tokio::test]
async fn it_connects_and_remembers_where_to_return() -> Result<()> {
    let mut server = mockito::Server::new();
    let connect = server
        .mock("GET", "/integrations/google/connect")
        .with_status(200)
        .with_body(r#"{"auth_url":"https://accounts.google.com/o/oauth2/auth?state=google_gmail"}"#)
        .create();

    let (registry, store, _rx) = registry(&server.url());
    let auth_url = registry.connect("google_gmail", Some("/chat/c1")).await?;

    assert!(auth_url.starts_with("https://accounts.google.com/"));
    assert_eq!(store.take_return_url(), Some("/chat/c1".to_string()));
    connect.assert();

    return Ok(());
}

#[tokio::test]
async fn it_disconnects() -> Result<()> {
    let mut server = mockito::Server::new();
    let disconnect = server
        .mock("DELETE", "/integrations/google/disconnect")
        .with_status(200)
        .with_body(r#"{"provider":"google_gmail","status":"disconnected"}"#)
        .create();

    let (registry, _store, mut rx) = registry(&server.url());
    let status = registry.disconnect("google_gmail").await?;

    assert_eq!(status.status, "disconnected");
    assert_eq!(
        rx.try_recv()?,
        Event::Notice(Notice::success("Gmail disconnected"))
    );
    disconnect.assert();

    return Ok(());
}
