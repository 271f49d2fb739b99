//! Session and message store
//!
//! [`ChatStore`] is the single source of truth for the active conversation:
//! the message list, the in-progress answer accumulator, the session
//! catalogue, and the guest message counter. It mediates between the UI,
//! the REST client, and the stream controller.
//!
//! The store is single-owner state: one task drives it, stream events
//! arrive through one ordered channel, and no locking is needed. Starting
//! a new exchange unconditionally supersedes any exchange still in flight;
//! the superseded answer's partial text is discarded, never persisted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::api::types::{ChatStreamRequest, MessageRecord, SessionDetail, SessionSummary};
use crate::api::ApiClient;
use crate::chat::stream::{StreamController, StreamEvent};
use crate::config::ChatConfig;
use crate::error::AskdocError;

use tokio::sync::mpsc;

/// Base for client-generated message ids
///
/// Optimistic messages need ids that cannot collide with server-assigned
/// rows; starting the per-store counter far above any plausible row id
/// keeps the two ranges disjoint.
const LOCAL_ID_BASE: i64 = 1 << 40;

/// One message in the active conversation
///
/// Immutable once appended. The in-progress assistant reply is held in the
/// store's accumulator, not in a list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Message id: server-assigned for loaded history, client-generated
    /// (monotonic, above the local id base) for optimistic entries
    pub id: i64,
    /// Message text
    pub content: String,
    /// True for user messages, false for assistant replies
    pub is_user_message: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for ChatMessage {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            is_user_message: record.is_user_message,
            created_at: record.created_at,
        }
    }
}

/// What happened to a send request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange was dispatched and the stream is opening
    Dispatched,
    /// Blank input, or a send was already in flight; nothing changed
    Ignored,
    /// The guest message limit was hit; the user must sign in first
    SignInRequired,
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Confirmation of a completed action
    Info,
    /// A failed operation the user should know about
    Error,
}

/// A non-blocking, user-facing notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Human-readable text
    pub text: String,
}

/// Single source of truth for the active conversation and session list
pub struct ChatStore {
    api: ApiClient,
    stream: StreamController,
    events: mpsc::UnboundedReceiver<StreamEvent>,

    messages: Vec<ChatMessage>,
    sessions: Vec<SessionSummary>,
    current_session_id: Option<i64>,

    /// Buffer for the in-progress assistant reply.
    accumulator: String,
    /// Search summary for the exchange in flight / just completed.
    search_summary: Option<String>,
    /// PDF ids sent as retrieval context with each exchange.
    context_pdfs: Vec<i64>,

    is_loading: bool,
    search_mode: bool,

    guest_messages_sent: u32,
    guest_message_limit: u32,

    next_local_id: i64,
    /// Monotonic tag for history loads; stale responses are discarded.
    history_epoch: u64,
    /// Monotonic tag for session-list loads.
    catalogue_epoch: u64,

    notices: VecDeque<Notice>,
}

impl ChatStore {
    /// Create a store bound to `api`
    ///
    /// The stream controller and its event channel are owned by the store;
    /// callers interact through the store's methods only.
    pub fn new(api: ApiClient, chat: &ChatConfig) -> Self {
        let (stream, events) = StreamController::new(api.clone(), chat.stream_idle_timeout());
        Self {
            api,
            stream,
            events,
            messages: Vec::new(),
            sessions: Vec::new(),
            current_session_id: None,
            accumulator: String::new(),
            search_summary: None,
            context_pdfs: Vec::new(),
            is_loading: false,
            search_mode: chat.search_mode,
            guest_messages_sent: 0,
            guest_message_limit: chat.guest_message_limit,
            next_local_id: LOCAL_ID_BASE,
            history_epoch: 0,
            catalogue_epoch: 0,
            notices: VecDeque::new(),
        }
    }

    /// Messages of the active conversation, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The session catalogue as last loaded
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    /// Id of the active session; `None` means not yet persisted
    pub fn current_session_id(&self) -> Option<i64> {
        self.current_session_id
    }

    /// The in-progress assistant reply accumulated so far
    pub fn accumulator(&self) -> &str {
        &self.accumulator
    }

    /// Search summary attached to the latest exchange, if any
    pub fn search_summary(&self) -> Option<&str> {
        self.search_summary.as_deref()
    }

    /// Whether an exchange is in flight
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether new exchanges request web search
    pub fn is_search_mode(&self) -> bool {
        self.search_mode
    }

    /// Toggle web search for subsequent exchanges
    pub fn set_search_mode(&mut self, on: bool) {
        self.search_mode = on;
    }

    /// PDF ids currently selected as retrieval context
    pub fn context_pdfs(&self) -> &[i64] {
        &self.context_pdfs
    }

    /// Add a PDF to the retrieval context for subsequent exchanges
    pub fn select_pdf(&mut self, pdf_id: i64) {
        if !self.context_pdfs.contains(&pdf_id) {
            self.context_pdfs.push(pdf_id);
        }
    }

    /// Remove a PDF from the retrieval context
    pub fn deselect_pdf(&mut self, pdf_id: i64) {
        self.context_pdfs.retain(|id| *id != pdf_id);
    }

    /// Messages sent while signed out
    pub fn guest_messages_sent(&self) -> u32 {
        self.guest_messages_sent
    }

    /// Reset the guest counter; called when the user signs in
    pub fn reset_guest_counter(&mut self) {
        self.guest_messages_sent = 0;
    }

    /// Whether a bearer token is currently held
    pub fn authenticated(&self) -> bool {
        self.api.token().is_authenticated()
    }

    /// The API client this store talks through
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Drain accumulated user-facing notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push_back(Notice {
            level,
            text: text.into(),
        });
    }

    fn allocate_local_id(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    /// Close any open stream and discard whatever it still had queued
    ///
    /// Events left in the channel belong to a superseded exchange; its
    /// partial answer is dropped by policy, so they must not reach the
    /// normal handlers.
    fn teardown_stream(&mut self) {
        self.stream.disconnect();
        while let Ok(event) = self.events.try_recv() {
            tracing::debug!(?event, "discarding event from superseded stream");
        }
        self.accumulator.clear();
    }

    /// Send a message, starting a new exchange
    ///
    /// Blank input and send-while-sending are ignored. For a signed-out
    /// user, the guard fires before any state is touched: with the default
    /// limit of 5, the fifth attempted message returns
    /// [`SendOutcome::SignInRequired`] and opens no stream.
    ///
    /// A dispatched send unconditionally supersedes any previous exchange
    /// (the partial answer, if any, is discarded), appends the user message
    /// optimistically, and opens the stream. Failures surface later as
    /// stream events, not as a return value.
    pub fn send_message(&mut self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() || self.is_loading {
            return SendOutcome::Ignored;
        }

        if !self.authenticated() && self.guest_messages_sent + 1 >= self.guest_message_limit {
            return SendOutcome::SignInRequired;
        }

        self.teardown_stream();
        self.search_summary = None;

        let message = ChatMessage {
            id: self.allocate_local_id(),
            content: text.to_string(),
            is_user_message: true,
            created_at: Utc::now(),
        };
        self.messages.push(message);

        if !self.authenticated() {
            self.guest_messages_sent += 1;
        }

        let request = ChatStreamRequest {
            query: text.to_string(),
            search_mode: self.search_mode,
            session_id: self.current_session_id,
            context_pdfs: self.context_pdfs.clone(),
        };
        self.stream.set_target(Some(request));
        self.is_loading = true;

        SendOutcome::Dispatched
    }

    /// Receive the next stream event for the exchange in flight
    ///
    /// Returns `None` only if the controller is gone, which cannot happen
    /// while the store is alive; callers may treat it as end-of-stream.
    pub async fn next_stream_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Apply one stream event to the store
    pub fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => {
                tracing::debug!("answer stream opened");
            }
            StreamEvent::Metadata(metadata) => {
                // A pending conversation adopts the server-issued id; a
                // concrete id is never reassigned.
                if let Some(session_id) = metadata.session_id {
                    if self.current_session_id.is_none() {
                        self.current_session_id = Some(session_id);
                        tracing::debug!(session_id, "adopted server-issued session id");
                    }
                }
                if let Some(summary) = metadata.search_summary {
                    if !summary.is_empty() {
                        self.search_summary = Some(summary);
                    }
                }
            }
            StreamEvent::Chunk(text) => {
                self.accumulator.push_str(&text);
            }
            StreamEvent::Errored(reason) => {
                // A failed exchange drops its partial answer.
                self.accumulator.clear();
                self.is_loading = false;
                self.stream.disconnect();
                self.push_notice(
                    NoticeLevel::Error,
                    format!("answer stream failed: {}", reason),
                );
            }
            StreamEvent::Closed => {
                if !self.accumulator.is_empty() {
                    let content = std::mem::take(&mut self.accumulator);
                    let message = ChatMessage {
                        id: self.allocate_local_id(),
                        content,
                        is_user_message: false,
                        created_at: Utc::now(),
                    };
                    self.messages.push(message);
                }
                self.is_loading = false;
                self.stream.disconnect();
            }
        }
    }

    /// Switch to another session and load its history
    ///
    /// Refused while an exchange is in flight: the active exchange must
    /// not be torn down implicitly. Returns false when refused; the
    /// message list and current session id are untouched and no network
    /// call is made.
    pub async fn switch_session(&mut self, session_id: i64) -> bool {
        if self.is_loading {
            tracing::debug!(session_id, "refusing session switch while sending");
            return false;
        }

        self.teardown_stream();
        self.messages.clear();
        self.search_summary = None;
        self.current_session_id = Some(session_id);
        self.load_session_messages(session_id).await;
        true
    }

    /// Start a fresh, not-yet-persisted conversation
    pub fn create_new_chat(&mut self) {
        self.teardown_stream();
        self.current_session_id = None;
        self.messages.clear();
        self.search_summary = None;
        self.context_pdfs.clear();
        self.is_loading = false;
    }

    /// Load the session catalogue
    ///
    /// Skipped while signed out (the backend has no sessions for guests).
    /// Safe to call repeatedly; a response that lost the race to a newer
    /// load is discarded.
    pub async fn load_sessions(&mut self) {
        if !self.authenticated() {
            return;
        }

        self.catalogue_epoch += 1;
        let epoch = self.catalogue_epoch;

        match self.api.list_sessions().await {
            Ok(sessions) => {
                if epoch == self.catalogue_epoch {
                    self.sessions = sessions;
                } else {
                    tracing::debug!("discarding stale session list response");
                }
            }
            Err(e) => {
                self.push_notice(
                    NoticeLevel::Error,
                    format!("failed to load chat sessions: {}", e),
                );
            }
        }
    }

    /// Load the message history of `session_id`
    ///
    /// A stale response (superseded by a newer load, or for a session that
    /// is no longer current) is discarded. A deleted session falls back to
    /// a fresh chat.
    pub async fn load_session_messages(&mut self, session_id: i64) {
        self.history_epoch += 1;
        let epoch = self.history_epoch;

        match self.api.get_session(session_id).await {
            Ok(detail) => self.apply_session_history(epoch, detail),
            Err(e) if is_not_found(&e) => self.handle_stale_session(session_id),
            Err(e) => {
                self.push_notice(
                    NoticeLevel::Error,
                    format!("failed to load chat session {}: {}", session_id, e),
                );
            }
        }
    }

    /// Install a loaded history if it is still the one we want
    fn apply_session_history(&mut self, epoch: u64, detail: SessionDetail) {
        if epoch != self.history_epoch {
            tracing::debug!(
                session_id = detail.id,
                "discarding stale session history response"
            );
            return;
        }
        if self.current_session_id != Some(detail.id) {
            tracing::debug!(
                session_id = detail.id,
                "discarding history for a session that is no longer current"
            );
            return;
        }
        self.messages = detail.messages.into_iter().map(ChatMessage::from).collect();
    }

    /// Rename a session, remote first
    ///
    /// Local state changes only after the backend confirms; a failed
    /// rename leaves the catalogue untouched and pushes an error notice.
    pub async fn rename_session(&mut self, session_id: i64, name: &str) {
        match self.api.rename_session(session_id, name).await {
            Ok(updated) => {
                if let Some(entry) = self.sessions.iter_mut().find(|s| s.id == session_id) {
                    entry.name = updated.name;
                }
                self.push_notice(NoticeLevel::Info, "chat renamed");
            }
            Err(e) if is_not_found(&e) => self.handle_stale_session(session_id),
            Err(e) => {
                self.push_notice(NoticeLevel::Error, format!("failed to rename chat: {}", e));
            }
        }
    }

    /// Delete a session, remote first
    ///
    /// Deleting the active session transitions to a fresh chat.
    pub async fn delete_session(&mut self, session_id: i64) {
        match self.api.delete_session(session_id).await {
            Ok(()) => {
                self.sessions.retain(|s| s.id != session_id);
                if self.current_session_id == Some(session_id) {
                    self.create_new_chat();
                }
                self.push_notice(NoticeLevel::Info, "chat deleted");
            }
            Err(e) if is_not_found(&e) => self.handle_stale_session(session_id),
            Err(e) => {
                self.push_notice(NoticeLevel::Error, format!("failed to delete chat: {}", e));
            }
        }
    }

    /// The backend no longer knows this session: drop it locally and fall
    /// back to a fresh chat when it was the active one
    fn handle_stale_session(&mut self, session_id: i64) {
        self.push_notice(
            NoticeLevel::Error,
            format!("chat session {} no longer exists", session_id),
        );
        self.sessions.retain(|s| s.id != session_id);
        if self.current_session_id == Some(session_id) {
            self.create_new_chat();
        }
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<AskdocError>(),
        Some(AskdocError::NotFound(_))
    )
}
