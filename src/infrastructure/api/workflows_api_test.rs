use anyhow::Result;

use super::WorkflowsApi;
use crate::domain::models::ClientError;
use crate::domain::models::Session;
use crate::domain::models::TokenPair;
use crate::domain::services::RequestPipeline;
use crate::domain::services::SessionStore;

fn workflows_api(url: &str) -> WorkflowsApi {
    let store = SessionStore::in_memory();
    store.set(Session::new(
        TokenPair {
            access_token: "a1".to_string(),
            refresh_token: "r1".to_string(),
        },
        None,
    ));
    let (pipeline, _rx) = RequestPipeline::with_url(url, store);

    return WorkflowsApi::new(pipeline);
}

#[tokio::test]
async fn it_lists_workflows() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/workflows/")
        .match_header("authorization", "Bearer a1")
        .with_status(200)
        .with_body(serde_json::json!([test_utils::workflow_body()]).to_string())
        .create();

    let workflows = workflows_api(&server.url()).list().await?;

    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].name, "Weekly digest");
    assert!(workflows[0].is_active);
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_reads_a_workflow_graph() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/workflows/wf-1")
        .with_status(200)
        .with_body(test_utils::workflow_body().to_string())
        .create();

    let workflow = workflows_api(&server.url()).get("wf-1").await?;

    assert_eq!(workflow.workflow_type.as_deref(), Some("scheduled"));
    assert_eq!(workflow.nodes.len(), 2);
    assert_eq!(workflow.nodes[1].node_type, "send_email");
    assert_eq!(workflow.nodes[1].position.x, 240.0);
    assert_eq!(workflow.edges[0].source_node, "n1");
    assert_eq!(workflow.edges[0].target_node, "n2");
    assert_eq!(workflow.edges[0].condition, None);
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_reads_workflows_without_a_graph() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/workflows/chat/0f8b7c2e")
        .with_status(200)
        .with_body(
            serde_json::json!([{
                "id": "wf-2",
                "name": "Draft replies",
                "status": "draft",
                "is_active": false,
            }])
            .to_string(),
        )
        .create();

    let workflows = workflows_api(&server.url()).for_chat("0f8b7c2e").await?;

    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].description, None);
    assert!(workflows[0].nodes.is_empty());
    assert!(workflows[0].edges.is_empty());
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_toggles_a_workflow() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/workflows/wf-1/toggle-active")
        .match_header("authorization", "Bearer a1")
        .with_status(200)
        .with_body(r#"{"is_active":false}"#)
        .create();

    let res = workflows_api(&server.url()).toggle_active("wf-1").await?;

    assert!(!res.is_active);
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_executes_a_workflow() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/workflows/wf-1/execute")
        .with_status(200)
        .with_body(r#"{"execution_id":"ex-9","status":"running"}"#)
        .create();

    let res = workflows_api(&server.url()).execute("wf-1").await?;

    assert_eq!(res.execution_id, "ex-9");
    assert_eq!(res.status, "running");
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_reports_a_missing_workflow() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/workflows/unknown")
        .with_status(404)
        .with_body(r#"{"detail":"Workflow not found"}"#)
        .create();

    let res = workflows_api(&server.url()).get("unknown").await;

    match res {
        Err(err @ ClientError::Api { .. }) => {
            assert_eq!(err.status(), Some(404));
            assert_eq!(err.to_string(), "Workflow not found");
        }
        other => panic!("Expected an API error, got {other:?}"),
    }
    mock.assert();
}
