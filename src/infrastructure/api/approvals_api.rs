use crate::domain::models::ApiRequest;
use crate::domain::models::ClientError;
use crate::domain::models::Decision;
use crate::domain::services::RequestPipeline;

#[derive(Clone)]
pub struct ApprovalsApi {
    pipeline: RequestPipeline,
}

impl ApprovalsApi {
    pub fn new(pipeline: RequestPipeline) -> ApprovalsApi {
        return ApprovalsApi { pipeline };
    }

    pub async fn submit(&self, action_id: &str, decision: Decision) -> Result<(), ClientError> {
        let path = format!("/approvals/{action_id}/{decision}");
        self.pipeline
            .execute(ApiRequest::post(&path, serde_json::json!({})))
            .await?;

        return Ok(());
    }
}
