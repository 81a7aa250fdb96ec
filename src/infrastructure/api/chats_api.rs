use reqwest::Response;

use crate::domain::models::ApiRequest;
use crate::domain::models::Author;
use crate::domain::models::ChatDetail;
use crate::domain::models::ChatId;
use crate::domain::models::ChatSummary;
use crate::domain::models::ClientError;
use crate::domain::services::RequestPipeline;

#[derive(Clone)]
pub struct ChatsApi {
    pipeline: RequestPipeline,
}

impl ChatsApi {
    pub fn new(pipeline: RequestPipeline) -> ChatsApi {
        return ChatsApi { pipeline };
    }

    pub async fn list(&self) -> Result<Vec<ChatSummary>, ClientError> {
        return self.pipeline.execute_json(ApiRequest::get("/chats/")).await;
    }

    pub async fn get(&self, chat_id: &str) -> Result<ChatDetail, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::get(&format!("/chats/{chat_id}")))
            .await;
    }

    pub async fn rename(&self, chat_id: &str, title: &str) -> Result<ChatSummary, ClientError> {
        return self
            .pipeline
            .execute_json(ApiRequest::patch(
                &format!("/chats/{chat_id}"),
                serde_json::json!({ "title": title }),
            ))
            .await;
    }

    pub async fn delete(&self, chat_id: &str) -> Result<(), ClientError> {
        self.pipeline
            .execute(ApiRequest::delete(&format!("/chats/{chat_id}")))
            .await?;

        return Ok(());
    }

    pub async fn delete_all(&self) -> Result<(), ClientError> {
        self.pipeline.execute(ApiRequest::delete("/chats/")).await?;
        return Ok(());
    }

    /// Posts a user message and hands back the response with its body still
    /// unread. An unsaved chat is created by the server, which then reports
    /// the new id in the `x-chat-id` header.
    pub async fn send_message(&self, chat_id: &ChatId, content: &str) -> Result<Response, ClientError> {
        let request = ApiRequest::post(
            &format!("/chats/{segment}/messages", segment = chat_id.path_segment()),
            serde_json::json!({
                "sender": Author::User,
                "content": content,
            }),
        )
        .streaming();

        return self.pipeline.execute(request).await;
    }
}
