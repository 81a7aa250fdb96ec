#[cfg(test)]
#[path = "workflows_api_test.rs"]
mod tests;

use crate::domain::models::ApiRequest;
use crate::domain::models::ClientError;
use crate::domain::models::ExecutionResponse;
use crate::domain::models::ToggleActiveResponse;
use crate::domain::models::Workflow;
use crate::domain::services::RequestPipeline;

#[derive(Clone)]
pub struct WorkflowsApi {
    pipeline: RequestPipeline,
}

impl WorkflowsApi {
    pub fn new(pipeline: RequestPipeline) -> WorkflowsApi {
        return WorkflowsApi { pipeline };
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, ClientError> {
        return self.pipeline.execute_json(ApiRequest::get("/workflows/")).await;
    }

    pub async fn get(&self, workflow_id: &str) -> Result<Workflow, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::get(&format!("/workflows/{workflow_id}")))
            .await;
    }

    /// Workflows the agent built inside one chat.
    pub async fn for_chat(&self, chat_id: &str) -> Result<Vec<Workflow>, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::get(&format!("/workflows/chat/{chat_id}")))
            .await;
    }

    /// Flips the active flag and returns the new value.
    pub async fn toggle_active(&self, workflow_id: &str) -> Result<ToggleActiveResponse, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::post(
                &format!("/workflows/{workflow_id}/toggle-active"),
                serde_json::json!({}),
            ))
            .await;
    }

    pub async fn execute(&self, workflow_id: &str) -> Result<ExecutionResponse, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::post(
                &format!("/workflows/{workflow_id}/execute"),
                serde_json::json!({}),
            ))
            .await;
    }
}
