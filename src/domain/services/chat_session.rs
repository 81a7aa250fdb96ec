#[cfg(test)]
#[path = "chat_session_test.rs"]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ActionApprovals;
use super::Resolution;
use crate::domain::models::Author;
use crate::domain::models::ChatId;
use crate::domain::models::ChatSummary;
use crate::domain::models::ClientError;
use crate::domain::models::Decision;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::Notice;
use crate::domain::models::TurnPhase;
use crate::domain::models::CHAT_ID_HEADER;
use crate::infrastructure::api::ChatsApi;

/// Raises the streaming flag for the lifetime of a turn and lowers it exactly
/// once when dropped, whichever way the turn ends.
struct StreamingGuard {
    flag: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Event>,
}

impl StreamingGuard {
    fn raise(flag: Arc<AtomicBool>, events: mpsc::UnboundedSender<Event>) -> StreamingGuard {
        flag.store(true, Ordering::SeqCst);
        let guard = StreamingGuard { flag, events };
        guard.emit(true);

        return guard;
    }

    fn emit(&self, streaming: bool) {
        if self.events.send(Event::StreamingChanged(streaming)).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.emit(false);
    }
}

/// Lowers the chat list loading flag when the fetch ends.
struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Turns raw body chunks into text. Multi-byte sequences split across chunks
/// are held back until the rest of the sequence arrives; invalid bytes are
/// replaced.
#[derive(Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut text = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

                    let Some(invalid_len) = err.error_len() else {
                        self.pending.drain(..valid_up_to);
                        return text;
                    };

                    text.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid_up_to + invalid_len);
                }
            }
        }
    }

    /// Whatever is left once the body ended. A truncated sequence becomes a
    /// replacement character.
    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).to_string();
        self.pending.clear();

        return rest;
    }
}

/// Drives the turns of one chat: optimistic messages, the streamed agent
/// reply, promotion of an unsaved chat, and rollback on failure. All state
/// changes are published as events.
pub struct ChatSession {
    chats: ChatsApi,
    approvals: ActionApprovals,
    events: mpsc::UnboundedSender<Event>,
    chat_id: ChatId,
    messages: Vec<Message>,
    phase: TurnPhase,
    streaming: Arc<AtomicBool>,
    loading_chats: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(
        chats: ChatsApi,
        approvals: ActionApprovals,
        events: mpsc::UnboundedSender<Event>,
    ) -> ChatSession {
        return ChatSession {
            chats,
            approvals,
            events,
            chat_id: ChatId::Unsaved,
            messages: vec![],
            phase: TurnPhase::Idle,
            streaming: Arc::new(AtomicBool::new(false)),
            loading_chats: Arc::new(AtomicBool::new(false)),
        };
    }

    pub fn chat_id(&self) -> &ChatId {
        return &self.chat_id;
    }

    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn phase(&self) -> TurnPhase {
        return self.phase;
    }

    pub fn is_streaming(&self) -> bool {
        return self.streaming.load(Ordering::SeqCst);
    }

    pub fn approvals(&self) -> &ActionApprovals {
        return &self.approvals;
    }

    pub fn new_chat(&mut self) {
        self.chat_id = ChatId::Unsaved;
        self.messages = vec![];
        self.emit(Event::MessagesReplaced(vec![]));
    }

    pub async fn load_chat(&mut self, chat_id: &str) -> Result<(), ClientError> {
        let chat_id = ChatId::parse(chat_id);
        let Some(server_id) = chat_id.server_id() else {
            self.new_chat();
            return Ok(());
        };

        let detail = self.chats.get(server_id).await?;
        self.chat_id = ChatId::Server(detail.id);
        self.messages = detail.messages;
        self.emit(Event::MessagesReplaced(self.messages.clone()));

        return Ok(());
    }

    /// Fetches the chat list. Returns `None` without a request when a fetch
    /// is already running.
    pub async fn load_chats(&self) -> Result<Option<Vec<ChatSummary>>, ClientError> {
        if self
            .loading_chats
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Chat list already loading");
            return Ok(None);
        }

        let _loading = LoadingGuard(self.loading_chats.clone());
        let chats = self.chats.list().await?;
        self.emit(Event::ChatsLoaded(chats.clone()));

        return Ok(Some(chats));
    }

    pub async fn rename_chat(&self, chat_id: &str, title: &str) -> Result<ChatSummary, ClientError> {
        let summary = self.chats.rename(chat_id, title).await?;
        self.load_chats().await?;

        return Ok(summary);
    }

    /// Deletes a chat. Deleting the open chat starts a new one.
    pub async fn delete_chat(&mut self, chat_id: &str) -> Result<(), ClientError> {
        self.chats.delete(chat_id).await?;
        if self.chat_id.server_id() == Some(chat_id) {
            self.new_chat();
        }

        self.load_chats().await?;
        return Ok(());
    }

    pub async fn delete_all_chats(&mut self) -> Result<(), ClientError> {
        self.chats.delete_all().await?;
        self.new_chat();
        self.emit(Event::ChatsLoaded(vec![]));

        return Ok(());
    }

    /// Runs one turn. The user message and an empty agent placeholder are
    /// shown right away; the placeholder then grows with every body chunk.
    /// On failure a placeholder that received no text is removed again; the
    /// user message and any partial reply stay.
    pub async fn send_message(
        &mut self,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let _streaming = StreamingGuard::raise(self.streaming.clone(), self.events.clone());
        let placeholder_id = self.begin_turn(content);

        let res = self.run_turn(content, &placeholder_id, cancel).await;
        return self.finish_turn(&placeholder_id, res).await;
    }

    /// Records a decision on an action and, once the server confirmed it,
    /// tells the agent in a follow-up turn. Returns whether a decision was
    /// sent.
    pub async fn resolve_action(
        &mut self,
        action_id: &str,
        decision: Decision,
        cancel: &CancellationToken,
    ) -> Result<bool, ClientError> {
        match self.approvals.resolve(action_id, decision).await? {
            Resolution::Ignored => return Ok(false),
            Resolution::Confirmed => {
                self.notice(Notice::success(&format!("Action {}", decision.status())));
                self.send_message(decision.follow_up(), cancel).await?;
                return Ok(true);
            }
        }
    }

    fn begin_turn(&mut self, content: &str) -> String {
        self.set_phase(TurnPhase::Sending);

        let user_message = Message::new(Author::User, content);
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id.to_string();

        self.messages.push(user_message.clone());
        self.emit(Event::MessageAppended(user_message));
        self.messages.push(placeholder.clone());
        self.emit(Event::MessageAppended(placeholder));

        return placeholder_id;
    }

    async fn run_turn(
        &mut self,
        content: &str,
        placeholder_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        let res = tokio::select! {
            res = self.chats.send_message(&self.chat_id, content) => res?,
            _ = cancel.cancelled() => {
                self.notice(Notice::info("Reply cancelled"));
                return Err(ClientError::Cancelled);
            }
        };

        self.set_phase(TurnPhase::Streaming);
        if self.promote(res.headers()) {
            if let Err(err) = self.load_chats().await {
                tracing::warn!(error = ?err, "Failed to refresh chats after promotion");
            }
        }

        return self
            .consume_body(placeholder_id, res.bytes_stream(), cancel)
            .await;
    }

    /// Adopts the id the server assigned to this chat. Returns whether the
    /// chat was promoted.
    fn promote(&mut self, headers: &HeaderMap) -> bool {
        let Some(server_id) = headers
            .get(CHAT_ID_HEADER)
            .and_then(|value| return value.to_str().ok())
            .map(|value| return value.trim())
            .filter(|value| return !value.is_empty())
        else {
            return false;
        };

        if self.chat_id.server_id() == Some(server_id) {
            return false;
        }

        tracing::debug!(chat_id = server_id, "Chat promoted");
        self.chat_id = ChatId::Server(server_id.to_string());
        self.emit(Event::ChatPromoted(server_id.to_string()));

        return true;
    }

    /// Folds body chunks into the placeholder, in arrival order. Returns the
    /// full reply.
    async fn consume_body<S, B, E>(
        &mut self,
        placeholder_id: &str,
        body: S,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        futures::pin_mut!(body);
        let mut decoder = Utf8Decoder::default();
        let mut reply = String::new();

        loop {
            let chunk = tokio::select! {
                chunk = body.next() => chunk,
                _ = cancel.cancelled() => {
                    self.notice(Notice::info("Reply cancelled"));
                    return Err(ClientError::Cancelled);
                }
            };

            match chunk {
                Some(Ok(bytes)) => {
                    let text = decoder.push(bytes.as_ref());
                    if text.is_empty() {
                        continue;
                    }

                    reply.push_str(&text);
                    self.update_message(placeholder_id, &reply);
                }
                Some(Err(err)) => {
                    let err = ClientError::Stream(err.to_string());
                    tracing::error!(error = ?err, "Reply stream failed");
                    self.notice(Notice::error(&err.to_string()));
                    return Err(err);
                }
                None => {
                    let rest = decoder.finish();
                    if !rest.is_empty() {
                        reply.push_str(&rest);
                        self.update_message(placeholder_id, &reply);
                    }

                    return Ok(reply);
                }
            }
        }
    }

    async fn finish_turn(
        &mut self,
        placeholder_id: &str,
        res: Result<String, ClientError>,
    ) -> Result<(), ClientError> {
        match res {
            Ok(_) => {
                self.set_phase(TurnPhase::Done);
                if let Err(err) = self.load_chats().await {
                    tracing::warn!(error = ?err, "Failed to refresh chats after reply");
                }
                self.set_phase(TurnPhase::Idle);

                return Ok(());
            }
            Err(err) => {
                let empty = self
                    .messages
                    .iter()
                    .any(|message| return message.id == placeholder_id && message.content.is_empty());
                if empty {
                    self.messages.retain(|message| return message.id != placeholder_id);
                    self.emit(Event::MessageRemoved(placeholder_id.to_string()));
                }
                self.set_phase(TurnPhase::Failed);
                self.set_phase(TurnPhase::Idle);

                return Err(err);
            }
        }
    }

    fn update_message(&mut self, message_id: &str, content: &str) {
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| return message.id == message_id)
        {
            message.content = content.to_string();
            self.emit(Event::MessageUpdated(
                message_id.to_string(),
                content.to_string(),
            ));
        }
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
        self.emit(Event::TurnPhaseChanged(phase));
    }

    fn notice(&self, notice: Notice) {
        self.emit(Event::Notice(notice));
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}
