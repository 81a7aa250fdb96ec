use test_utils::approval_reply_fixture;

use super::Author;
use super::Message;

#[test]
fn it_executes_new() {
    let msg = Message::new(Author::User, "Hi there!");
    assert_eq!(msg.author, Author::User);
    assert_eq!(msg.author.to_string(), "user");
    assert_eq!(msg.content, "Hi there!");
    assert!(!msg.id.is_empty());
    assert!(!msg.created_at.is_empty());
}

#[test]
fn it_generates_unique_ids() {
    let first = Message::new(Author::User, "Hi");
    let second = Message::placeholder();
    assert_ne!(first.id, second.id);
    assert_eq!(second.author, Author::Agent);
    assert!(second.content.is_empty());
}

#[test]
fn it_strips_markers_from_display_text() {
    let mut msg = Message::placeholder();
    msg.content = approval_reply_fixture().to_string();

    insta::assert_snapshot!(msg.display_text(), @r###"
    I drafted the email to the team with the weekly numbers.



    Let me know if I should send it.
    "###);
}

#[test]
fn it_exposes_the_action_of_agent_messages() {
    let mut msg = Message::placeholder();
    msg.content = approval_reply_fixture().to_string();

    let action = msg.action().unwrap();
    assert_eq!(action.action_id, "3f1c9a2e-8d4b-4f0e-b6a1-2c7d9e5f4a30");
    assert_eq!(action.action_name, "send_email");
}

#[test]
fn it_ignores_markers_in_user_messages() {
    let msg = Message::new(Author::User, approval_reply_fixture());
    assert!(msg.action().is_none());
}

#[test]
fn it_deserializes_server_messages() {
    let payload = r#"{
        "id": "c3a1",
        "chat_id": "a9f2",
        "sender": "agent",
        "content": "Done.",
        "created_at": "2024-05-01T10:00:00"
    }"#;

    let msg: Message = serde_json::from_str(payload).unwrap();
    assert_eq!(msg.author, Author::Agent);
    assert_eq!(msg.content, "Done.");
    assert_eq!(msg.thought, None);
}
