#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

/// Body returned by the auth endpoints on login, signup, and refresh.
pub fn token_pair_body(access_token: &str, refresh_token: &str) -> String {
    return serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
    })
    .to_string();
}

pub fn profile_body() -> String {
    return serde_json::json!({
        "id": "7c0a7f43-58a6-4e0e-9a43-0c9d3c8f5a11",
        "username": "ada",
        "email": "ada@example.com",
        "created_at": "2024-05-01T10:00:00",
    })
    .to_string();
}

pub fn chat_list_body() -> String {
    return serde_json::json!([
        {
            "id": "0f8b7c2e-1111-4c3a-9d55-2a9c4f6e7a10",
            "title": "Weekly report",
            "created_at": "2024-05-01T10:00:00",
            "last_activity": "2024-05-02T09:30:00",
            "chat_uuid": "0f8b7c2e-1111-4c3a-9d55-2a9c4f6e7a10",
        },
        {
            "id": "5e1d2a90-2222-4b8e-8f0a-6a1c3e9d7b20",
            "title": "Inbox cleanup",
            "created_at": "2024-04-28T08:00:00",
            "last_activity": "2024-04-28T08:15:00",
            "chat_uuid": "5e1d2a90-2222-4b8e-8f0a-6a1c3e9d7b20",
        },
    ])
    .to_string();
}

/// An agent reply that asks for approval before sending an email.
pub fn approval_reply_fixture() -> &'static str {
    return r#"
I drafted the email to the team with the weekly numbers.

[ACTION_ID:3f1c9a2e-8d4b-4f0e-b6a1-2c7d9e5f4a30:send_email]

Let me know if I should send it.
"#
    .trim();
}

/// A workflow with two connected nodes, as returned by `GET /workflows/{id}`.
pub fn workflow_body() -> serde_json::Value {
    return serde_json::json!({
        "id": "wf-1",
        "name": "Weekly digest",
        "description": "Summarizes the inbox every Monday",
        "status": "active",
        "is_active": true,
        "workflow_type": "scheduled",
        "nodes": [
            {
                "id": "n1",
                "node_type": "trigger",
                "config": { "cron": "0 9 * * 1" },
                "position": { "x": 0.0, "y": 0.0 },
            },
            {
                "id": "n2",
                "node_type": "send_email",
                "config": { "to": "team@example.com" },
                "position": { "x": 240.0, "y": 0.0 },
            },
        ],
        "edges": [
            { "id": "e1", "source_node": "n1", "target_node": "n2" },
        ],
    });
}
