use std::time::Duration;

use super::HttpAuthority;
use crate::domain::models::CredentialAuthority;
use crate::domain::models::RenewError;
use crate::domain::models::TokenPair;

fn authority(url: &str) -> HttpAuthority {
    return HttpAuthority::new(reqwest::Client::new(), url, Duration::from_millis(500));
}

#[tokio::test]
async fn it_renews_credentials() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/auth/refresh")
        .match_body(mockito::Matcher::Json(
            serde_json::json!({"refresh_token": "r1"}),
        ))
        .with_status(200)
        .with_body(test_utils::token_pair_body("a2", "r2"))
        .create();

    let res = authority(&server.url()).renew("r1").await;

    assert_eq!(
        res,
        Ok(TokenPair {
            access_token: "a2".to_string(),
            refresh_token: "r2".to_string(),
        })
    );
    mock.assert();
}

#[tokio::test]
async fn it_classifies_unauthorized_as_rejected() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body(r#"{"detail":"Invalid refresh token"}"#)
        .create();

    let res = authority(&server.url()).renew("r1").await;

    assert_eq!(
        res,
        Err(RenewError::Rejected("Invalid refresh token".to_string()))
    );
    mock.assert();
}

#[tokio::test]
async fn it_classifies_forbidden_as_rejected() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/auth/refresh").with_status(403).create();

    let res = authority(&server.url()).renew("r1").await;

    assert!(matches!(res, Err(RenewError::Rejected(_))));
    mock.assert();
}

#[tokio::test]
async fn it_classifies_server_errors_as_transport() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/auth/refresh").with_status(503).create();

    let res = authority(&server.url()).renew("r1").await;

    assert!(matches!(res, Err(RenewError::Transport(_))));
    mock.assert();
}

#[tokio::test]
async fn it_classifies_unreachable_servers_as_transport() {
    let res = authority("http://127.0.0.1:9").renew("r1").await;

    assert!(matches!(res, Err(RenewError::Transport(_))));
}
