#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use yansi::Paint;

use crate::application::client::Client;
use crate::domain::models::settled_len;
use crate::domain::models::strip_markers;
use crate::domain::models::ActionMarker;
use crate::domain::models::Author;
use crate::domain::models::ClientError;
use crate::domain::models::Decision;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::Notice;
use crate::domain::models::NoticeLevel;
use crate::domain::services::ChatSession;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new - Start a new chat.
- /chats - List your chats.
- /open [ID] - Open a saved chat.
- /approve [ACTION ID] - Approve the pending action.
- /reject [ACTION ID] - Reject the pending action.
- /help - Show this help.
- /quit, /exit - Leave the chat.

HOTKEYS:
- CTRL+C - Stop the reply that is streaming in. Leaves the chat when no reply is streaming.
    "#;

    return text.trim().to_string();
}

/// Writes events to the terminal. The agent reply is printed as it grows;
/// only text that can no longer turn into an action marker is written.
#[derive(Default)]
pub struct Renderer {
    /// Reply being streamed and how many bytes of it are on screen.
    streaming: Option<(String, usize)>,
}

impl Renderer {
    pub fn render<W: Write>(&mut self, event: &Event, out: &mut W) -> Result<()> {
        match event {
            Event::MessageAppended(message) => {
                if message.author == Author::Agent {
                    write!(out, "{} ", Paint::cyan("agent>").bold())?;
                    self.streaming = Some((message.id.to_string(), 0));
                    self.write_growth(&message.id, &message.content, out)?;
                }
            }
            Event::MessageUpdated(message_id, content) => {
                self.write_growth(message_id, content, out)?;
            }
            Event::MessageRemoved(message_id) => {
                if self.is_streaming(message_id) {
                    self.streaming = None;
                    writeln!(out, "{}", Paint::new("[reply discarded]").dimmed())?;
                }
            }
            Event::MessagesReplaced(messages) => {
                self.streaming = None;
                for message in messages {
                    write_message(message, out)?;
                }
            }
            Event::StreamingChanged(false) => {
                self.end_line(out)?;
            }
            Event::Notice(notice) => {
                self.end_line(out)?;
                writeln!(out, "{}", format_notice(notice))?;
            }
            Event::ChatPromoted(chat_id) => {
                tracing::debug!(%chat_id, "Chat saved");
            }
            Event::ChatsLoaded(_)
            | Event::StreamingChanged(true)
            | Event::TurnPhaseChanged(_)
            | Event::Barrier(_) => {}
        }

        out.flush()?;
        return Ok(());
    }

    fn is_streaming(&self, message_id: &str) -> bool {
        return matches!(&self.streaming, Some((id, _)) if id == message_id);
    }

    /// Finishes the line of a reply still being printed.
    fn end_line<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.streaming.take().is_some() {
            writeln!(out)?;
        }

        return Ok(());
    }

    fn write_growth<W: Write>(&mut self, message_id: &str, content: &str, out: &mut W) -> Result<()> {
        let Some((id, printed)) = self.streaming.as_mut() else {
            return Ok(());
        };
        if id != message_id {
            return Ok(());
        }

        let display = strip_markers(content);
        let settled = &display[..settled_len(&display)];
        if let Some(growth) = settled.get(*printed..) {
            write!(out, "{growth}")?;
            *printed = settled.len();
        }

        return Ok(());
    }
}

fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => return Paint::new(&notice.text).dimmed().to_string(),
        NoticeLevel::Success => return Paint::green(&notice.text).to_string(),
        NoticeLevel::Error => return Paint::red(&notice.text).to_string(),
    }
}

fn write_message<W: Write>(message: &Message, out: &mut W) -> Result<()> {
    let label = match message.author {
        Author::User => Paint::magenta("you>").bold(),
        Author::Agent => Paint::cyan("agent>").bold(),
    };
    writeln!(out, "{label} {}", message.display_text())?;

    return Ok(());
}

/// Prints every event until all senders are gone. Each `Event::Barrier` is
/// acknowledged on `printed` after everything before it was written.
pub async fn render_events(
    mut rx: mpsc::UnboundedReceiver<Event>,
    printed: watch::Sender<u64>,
) -> Result<()> {
    let mut renderer = Renderer::default();
    let mut stdout = io::stdout();

    while let Some(event) = rx.recv().await {
        renderer.render(&event, &mut stdout)?;
        if let Event::Barrier(seq) = event {
            printed.send_replace(seq);
        }
    }

    return Ok(());
}

/// Lets the chat loop write to stdout without interleaving with the event
/// printer.
pub struct Console {
    events: mpsc::UnboundedSender<Event>,
    printed: watch::Receiver<u64>,
    next: u64,
}

impl Console {
    pub fn new(events: mpsc::UnboundedSender<Event>, printed: watch::Receiver<u64>) -> Console {
        return Console {
            events,
            printed,
            next: 0,
        };
    }

    /// Waits until every event published so far is on screen.
    pub async fn flush(&mut self) {
        self.next += 1;
        let seq = self.next;
        if self.events.send(Event::Barrier(seq)).is_err() {
            return;
        }

        if self.printed.wait_for(|printed| return *printed >= seq).await.is_err() {
            tracing::debug!("Event printer stopped before acknowledging");
        }
    }

    pub async fn println(&mut self, text: &str) {
        self.flush().await;
        println!("{text}");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    return mutex.lock().unwrap_or_else(PoisonError::into_inner);
}

/// Routes CTRL+C for the whole chat: it cancels the turn in flight, or ends
/// the chat when no turn runs.
#[derive(Clone, Default)]
pub struct Interrupts {
    turn: Arc<Mutex<Option<CancellationToken>>>,
    quit: CancellationToken,
}

impl Interrupts {
    pub fn listen(&self) -> JoinHandle<()> {
        let interrupts = self.clone();
        return tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts.interrupt();
            }
        });
    }

    pub fn begin_turn(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        *lock(&self.turn) = Some(cancel.clone());

        return cancel;
    }

    pub fn end_turn(&self) {
        *lock(&self.turn) = None;
    }

    pub fn interrupt(&self) {
        match lock(&self.turn).take() {
            Some(cancel) => cancel.cancel(),
            None => self.quit.cancel(),
        }
    }

    pub fn quit(&self) -> &CancellationToken {
        return &self.quit;
    }
}

pub fn format_action(marker: &ActionMarker) -> String {
    return format!(
        "{} wants to {} ({})",
        Paint::yellow("Action").bold(),
        marker.label(),
        marker.action_id
    );
}

struct ChatLoop {
    session: ChatSession,
    console: Console,
    interrupts: Interrupts,
}

impl ChatLoop {
    async fn run_turn(&mut self, content: &str) -> Result<(), ClientError> {
        let cancel = self.interrupts.begin_turn();
        let res = self.session.send_message(content, &cancel).await;
        self.interrupts.end_turn();
        tracing::debug!(
            phase = %self.session.phase(),
            chat_id = %self.session.chat_id(),
            "Turn ended"
        );

        return res;
    }

    async fn resolve(&mut self, action_id: Option<&str>, decision: Decision) -> Result<(), ClientError> {
        let pending = self.session.approvals().pending(self.session.messages());
        let action_id = match action_id {
            Some(action_id) => action_id.to_string(),
            None => match pending.last() {
                Some(marker) => marker.action_id.to_string(),
                None => {
                    let text = Paint::new("No action is waiting for a decision.").dimmed();
                    self.console.println(&text.to_string()).await;
                    return Ok(());
                }
            },
        };

        let cancel = self.interrupts.begin_turn();
        let res = self.session.resolve_action(&action_id, decision, &cancel).await;
        self.interrupts.end_turn();

        if !res? {
            let status = self.session.approvals().status(&action_id);
            let text = if status.is_final() {
                format!("Action {action_id} was already {status}.")
            } else {
                format!("Action {action_id} is not pending.")
            };
            self.console.println(&Paint::new(text).dimmed().to_string()).await;
        }

        return Ok(());
    }

    /// Asks what to do with the action the last reply requested, if any.
    async fn prompt_pending_action(&mut self) -> Result<(), ClientError> {
        let Some(marker) = self
            .session
            .messages()
            .last()
            .and_then(|message| return self.session.approvals().marker_for(message))
            .filter(|marker| return self.session.approvals().controls_enabled(&marker.action_id))
        else {
            return Ok(());
        };

        self.console.println(&format_action(&marker)).await;
        let choice = tokio::task::spawn_blocking(|| {
            return Select::with_theme(&ColorfulTheme::default())
                .with_prompt("What should the agent do?")
                .default(0)
                .items(&["Confirm action", "Cancel", "Decide later"])
                .interact_opt();
        })
        .await;

        let decision = match choice {
            Ok(Ok(Some(0))) => Decision::Approve,
            Ok(Ok(Some(1))) => Decision::Reject,
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(err)) => {
                tracing::warn!(error = ?err, "Action prompt failed");
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Action prompt task failed");
                return Ok(());
            }
        };

        return self.resolve(Some(&marker.action_id), decision).await;
    }

    async fn handle_line(&mut self, line: &str) -> Result<bool, ClientError> {
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, Some(arg.trim()).filter(|arg| return !arg.is_empty())),
            None => (line, None),
        };

        match command {
            "/quit" | "/exit" => return Ok(false),
            "/help" => self.console.println(&help_text()).await,
            "/new" => {
                self.session.new_chat();
                let text = Paint::new("Started a new chat.").dimmed();
                self.console.println(&text.to_string()).await;
            }
            "/chats" => {
                if let Some(chats) = self.session.load_chats().await? {
                    let lines = chats
                        .iter()
                        .map(|chat| {
                            let open = self.session.chat_id().server_id() == Some(chat.id.as_str());
                            let marker = if open { "*" } else { "-" };
                            return format!("{marker} (ID: {}) {}", chat.id, chat.title);
                        })
                        .collect::<Vec<String>>();
                    self.console.println(&lines.join("\n")).await;
                }
            }
            "/open" => match arg {
                Some(chat_id) => self.session.load_chat(chat_id).await?,
                None => self.console.println("Usage: /open <chat id>").await,
            },
            "/approve" => self.resolve(arg, Decision::Approve).await?,
            "/reject" => self.resolve(arg, Decision::Reject).await?,
            _ => {
                self.run_turn(line).await?;
                self.prompt_pending_action().await?;
            }
        }

        return Ok(true);
    }
}

/// Line based chat loop reading from stdin.
pub async fn start_chat(
    client: &Client,
    chat_id: Option<&str>,
    printed: watch::Receiver<u64>,
) -> Result<()> {
    let mut session = client.chat_session();
    if let Some(chat_id) = chat_id {
        session.load_chat(chat_id).await?;
    }

    let mut chat = ChatLoop {
        session,
        console: Console::new(client.events(), printed),
        interrupts: Interrupts::default(),
    };

    if let Some(identity) = client.store.identity() {
        let text = format!("Signed in as {}", Paint::new(&identity.username).bold());
        chat.console.println(&text).await;
    }
    if chat.session.chat_id().is_unsaved() {
        let text = Paint::new("New chat. It is saved with your first message.").dimmed();
        chat.console.println(&text.to_string()).await;
    }
    let text = Paint::new("Type a message and press enter. /help lists commands.").dimmed();
    chat.console.println(&text.to_string()).await;

    let listener = chat.interrupts.listen();
    let quit = chat.interrupts.quit().clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = quit.cancelled() => None,
        };
        let Some(line) = line else {
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match chat.handle_line(line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) if err.requires_login() => {
                chat.console.println("Run `agentdesk login` to sign in again.").await;
                break;
            }
            Err(err) => {
                tracing::debug!(error = ?err, "Chat command failed");
            }
        }
        chat.console.flush().await;
    }

    listener.abort();
    return Ok(());
}
