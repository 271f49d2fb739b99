//! Answer stream controller
//!
//! This module implements [`StreamController`], which owns the lifecycle of
//! the single server-push connection used to receive an assistant answer.
//! One exchange is one `POST /chat/stream` whose response body is an SSE
//! stream of `data: {json}\n\n` frames, each either out-of-band metadata or
//! an answer text fragment.
//!
//! # Delivery model
//!
//! All connection activity is delivered as [`StreamEvent`] values through a
//! single ordered channel handed out by [`StreamController::new`]. The
//! consumer (the chat store) sees one linear sequence:
//!
//! ```text
//! Opened, Metadata(..)?, Chunk(..)*, (Errored(..))?, Closed
//! ```
//!
//! # Lifecycle guarantees
//!
//! - At most one connection is open at any instant. Setting a new target
//!   closes the previous connection before the new one opens.
//! - `Closed` is delivered exactly once per connection, whether the stream
//!   ended normally, failed, or was superseded.
//! - After a connection's `Closed`, no further event from that connection
//!   is ever delivered. Enforced by a generation counter checked on every
//!   send plus a once-flag on the terminal event.
//! - A transport error emits `Errored` then `Closed`; consumers must not
//!   double-handle cleanup.
//! - There is no automatic reconnect. The caller decides whether to open a
//!   new exchange.
//!
//! An idle timeout bounds a silent connection: if no bytes arrive within
//! it, the connection is torn down as a transport error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::{SearchMetadata, StreamFrame};
use crate::api::{ApiClient, ChatStreamRequest};

/// One event from the answer stream, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The connection is open and frames may follow
    Opened,
    /// Out-of-band metadata (session id assignment, search summary)
    Metadata(SearchMetadata),
    /// A fragment of the assistant's answer
    Chunk(String),
    /// The connection failed; a `Closed` follows immediately
    Errored(String),
    /// The connection is gone, normally or otherwise; terminal
    Closed,
}

/// Owns the single answer-stream connection
///
/// Created together with the receiving end of its event channel:
///
/// ```no_run
/// use std::time::Duration;
/// use askdoc::api::ApiClient;
/// use askdoc::auth::TokenHandle;
/// use askdoc::chat::StreamController;
/// use url::Url;
///
/// let api = ApiClient::new(
///     Url::parse("http://localhost:8000/").unwrap(),
///     TokenHandle::new(None),
///     Duration::from_secs(30),
/// ).unwrap();
/// let (controller, events) = StreamController::new(api, Duration::from_secs(120));
/// ```
pub struct StreamController {
    api: ApiClient,
    idle_timeout: Duration,
    events_tx: mpsc::UnboundedSender<StreamEvent>,
    /// Bumped whenever the active connection changes; reader tasks from
    /// older generations can no longer deliver events.
    generation: Arc<AtomicU64>,
    active: Option<ActiveStream>,
}

/// Book-keeping for the currently open connection
struct ActiveStream {
    target: ChatStreamRequest,
    /// Once-flag for the terminal `Closed` event.
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl StreamController {
    /// Create a controller and the ordered event channel it delivers into
    ///
    /// # Arguments
    ///
    /// * `api` - Client used to open stream requests.
    /// * `idle_timeout` - Maximum silence tolerated on an open stream.
    pub fn new(
        api: ApiClient,
        idle_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            api,
            idle_timeout,
            events_tx,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        };
        (controller, events_rx)
    }

    /// Whether a connection is currently held open
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// The target of the currently open connection, if any
    pub fn target(&self) -> Option<&ChatStreamRequest> {
        self.active.as_ref().map(|active| &active.target)
    }

    /// Point the controller at a target, or at nothing
    ///
    /// - `None` closes any open connection and returns to idle.
    /// - A target equal to the currently open one is a no-op.
    /// - Any other target closes the old connection first, then opens the
    ///   new one. Two connections are never open at once.
    pub fn set_target(&mut self, target: Option<ChatStreamRequest>) {
        match target {
            None => self.disconnect(),
            Some(request) => {
                if self.target() == Some(&request) {
                    return;
                }
                self.disconnect();
                self.connect(request);
            }
        }
    }

    /// Close the open connection, if any
    ///
    /// Emits the connection's `Closed` event unless it was already
    /// delivered. Calling this while idle is a no-op.
    pub fn disconnect(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        // Invalidate the reader task before aborting it so nothing it has
        // in flight can be delivered past this point.
        self.generation.fetch_add(1, Ordering::SeqCst);
        active.task.abort();

        if active
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.events_tx.send(StreamEvent::Closed);
        }
    }

    /// Open a connection for `request` on a background task
    fn connect(&mut self, request: ChatStreamRequest) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let closed = Arc::new(AtomicBool::new(false));
        let gate = EventGate {
            tx: self.events_tx.clone(),
            current: Arc::clone(&self.generation),
            generation,
            closed: Arc::clone(&closed),
        };

        let api = self.api.clone();
        let target = request.clone();
        let idle_timeout = self.idle_timeout;
        let task = tokio::spawn(async move {
            run_exchange(api, target, gate, idle_timeout).await;
        });

        self.active = Some(ActiveStream {
            target: request,
            closed,
            task,
        });
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

/// Send side of the event channel, scoped to one connection
///
/// Events pass only while this connection is still the controller's
/// current generation and its terminal event has not been delivered.
struct EventGate {
    tx: mpsc::UnboundedSender<StreamEvent>,
    current: Arc<AtomicU64>,
    generation: u64,
    closed: Arc<AtomicBool>,
}

impl EventGate {
    /// Whether this connection may still deliver events
    fn live(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
            && !self.closed.load(Ordering::SeqCst)
    }

    /// Deliver a non-terminal event; returns false once the gate is dead
    fn send(&self, event: StreamEvent) -> bool {
        if !self.live() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    /// Deliver the terminal `Closed` event at most once
    fn close(&self) {
        if self.current.load(Ordering::SeqCst) == self.generation
            && self
                .closed
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            let _ = self.tx.send(StreamEvent::Closed);
        }
    }

    /// Deliver `Errored` then `Closed`
    fn fail(&self, reason: impl Into<String>) {
        self.send(StreamEvent::Errored(reason.into()));
        self.close();
    }
}

/// Open the stream request and pump its frames until it ends
async fn run_exchange(
    api: ApiClient,
    request: ChatStreamRequest,
    gate: EventGate,
    idle_timeout: Duration,
) {
    let response = match api.open_chat_stream(&request).await {
        Ok(response) => response,
        Err(e) => {
            gate.fail(e.to_string());
            return;
        }
    };

    gate.send(StreamEvent::Opened);
    pump_frames(response.bytes_stream(), &gate, idle_timeout).await;
}

/// Parse an SSE byte stream and deliver its frames through the gate
///
/// Frames are separated by blank lines. A frame whose `data:` payload does
/// not parse is logged and skipped; it does not terminate the connection.
/// Read errors and idle timeouts terminate the connection as failed;
/// end-of-stream is a normal close.
async fn pump_frames<E: std::fmt::Display>(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, E>>,
    gate: &EventGate,
    idle_timeout: Duration,
) {
    let mut buffer = String::new();

    tokio::pin!(byte_stream);

    loop {
        let chunk = match tokio::time::timeout(idle_timeout, byte_stream.next()).await {
            Err(_) => {
                gate.fail("stream idle timeout");
                return;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                gate.fail(format!("stream read failed: {}", e));
                return;
            }
            Ok(Some(Ok(chunk))) => chunk,
        };

        match std::str::from_utf8(&chunk) {
            Ok(text) => buffer.push_str(text),
            Err(_) => {
                tracing::warn!("skipping non-utf8 stream chunk");
                continue;
            }
        }

        // Frames are separated by blank lines (`\n\n`).
        while let Some(pos) = buffer.find("\n\n") {
            let block = buffer[..pos].to_string();
            buffer.drain(..pos + 2);
            if !deliver_block(&block, gate) {
                return;
            }
        }
    }

    // A trailing partial block can still hold a complete frame.
    if !buffer.is_empty() {
        deliver_block(&buffer, gate);
    }

    gate.close();
}

/// Decode one SSE block and deliver the event it carries
///
/// Returns false once the gate refuses delivery (connection superseded or
/// the receiver is gone), which stops the pump early.
fn deliver_block(block: &str, gate: &EventGate) -> bool {
    let Some(data) = extract_data(block) else {
        return gate.live();
    };

    match serde_json::from_str::<StreamFrame>(&data) {
        Ok(StreamFrame::Metadata { data }) => gate.send(StreamEvent::Metadata(data)),
        Ok(StreamFrame::AnswerChunk { text }) => gate.send(StreamEvent::Chunk(text)),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream frame");
            gate.live()
        }
    }
}

/// Collect the `data:` payload of one SSE block
///
/// Multi-line data values are joined with newlines. Comment lines (`:`)
/// and fields other than `data:` are ignored; the backend emits only
/// `data:` frames.
fn extract_data(block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(5);

    fn make_gate() -> (EventGate, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = EventGate {
            tx,
            current: Arc::new(AtomicU64::new(1)),
            generation: 1,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (gate, rx)
    }

    fn ok_chunks(parts: &[&str]) -> Vec<std::result::Result<Bytes, std::io::Error>> {
        parts
            .iter()
            .map(|p| Ok(Bytes::from(p.as_bytes().to_vec())))
            .collect()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_extract_data_single_line() {
        assert_eq!(
            extract_data("data: {\"a\":1}"),
            Some("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_extract_data_joins_multiline() {
        assert_eq!(
            extract_data("data: first\ndata: second"),
            Some("first\nsecond".to_string())
        );
    }

    #[test]
    fn test_extract_data_ignores_comments_and_other_fields() {
        assert_eq!(
            extract_data(": keep-alive\nevent: message\ndata: payload"),
            Some("payload".to_string())
        );
        assert_eq!(extract_data(": keep-alive"), None);
        assert_eq!(extract_data(""), None);
    }

    #[tokio::test]
    async fn test_pump_delivers_frames_in_order() {
        let (gate, mut rx) = make_gate();
        let body = concat!(
            "data: {\"type\":\"metadata\",\"data\":{\"chat_session_id\":42}}\n\n",
            "data: {\"type\":\"answer_chunk\",\"text\":\"Hi\"}\n\n",
            "data: {\"type\":\"answer_chunk\",\"text\":\" there\"}\n\n",
        );
        let stream = futures::stream::iter(ok_chunks(&[body]));

        pump_frames(stream, &gate, IDLE).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::Metadata(md) if md.session_id == Some(42)));
        assert_eq!(events[1], StreamEvent::Chunk("Hi".to_string()));
        assert_eq!(events[2], StreamEvent::Chunk(" there".to_string()));
        assert_eq!(events[3], StreamEvent::Closed);
    }

    #[tokio::test]
    async fn test_pump_handles_frame_split_across_chunks() {
        let (gate, mut rx) = make_gate();
        let stream = futures::stream::iter(ok_chunks(&[
            "data: {\"type\":\"answer_",
            "chunk\",\"text\":\"joined\"}\n\n",
        ]));

        pump_frames(stream, &gate, IDLE).await;

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("joined".to_string()),
                StreamEvent::Closed
            ]
        );
    }

    #[tokio::test]
    async fn test_pump_skips_malformed_frame_and_continues() {
        let (gate, mut rx) = make_gate();
        let body = concat!(
            "data: {not json at all\n\n",
            "data: {\"type\":\"answer_chunk\",\"text\":\"ok\"}\n\n",
        );
        let stream = futures::stream::iter(ok_chunks(&[body]));

        pump_frames(stream, &gate, IDLE).await;

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![StreamEvent::Chunk("ok".to_string()), StreamEvent::Closed]
        );
    }

    #[tokio::test]
    async fn test_pump_read_error_emits_errored_then_closed() {
        let (gate, mut rx) = make_gate();
        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"answer_chunk\",\"text\":\"partial\"}\n\n",
            )),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )),
        ];
        let stream = futures::stream::iter(chunks);

        pump_frames(stream, &gate, IDLE).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::Chunk("partial".to_string()));
        assert!(matches!(&events[1], StreamEvent::Errored(reason) if reason.contains("reset")));
        assert_eq!(events[2], StreamEvent::Closed);
    }

    #[tokio::test]
    async fn test_pump_idle_timeout_fails_the_stream() {
        let (gate, mut rx) = make_gate();
        let stream = futures::stream::pending::<std::result::Result<Bytes, std::io::Error>>();

        pump_frames(stream, &gate, Duration::from_millis(20)).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[0], StreamEvent::Errored(reason) if reason.contains("idle timeout"))
        );
        assert_eq!(events[1], StreamEvent::Closed);
    }

    #[tokio::test]
    async fn test_pump_trailing_block_without_terminator_is_delivered() {
        let (gate, mut rx) = make_gate();
        let stream = futures::stream::iter(ok_chunks(&[
            "data: {\"type\":\"answer_chunk\",\"text\":\"tail\"}",
        ]));

        pump_frames(stream, &gate, IDLE).await;

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![StreamEvent::Chunk("tail".to_string()), StreamEvent::Closed]
        );
    }

    #[tokio::test]
    async fn test_superseded_gate_delivers_nothing() {
        let (gate, mut rx) = make_gate();
        // A newer connection exists: this gate's generation is stale.
        gate.current.store(2, Ordering::SeqCst);

        let stream = futures::stream::iter(ok_chunks(&[
            "data: {\"type\":\"answer_chunk\",\"text\":\"late\"}\n\n",
        ]));
        pump_frames(stream, &gate, IDLE).await;

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_gate_close_is_exactly_once() {
        let (gate, mut rx) = make_gate();
        gate.close();
        gate.close();
        gate.fail("after close");

        let events = drain(&mut rx);
        assert_eq!(events, vec![StreamEvent::Closed]);
    }

    fn make_controller() -> (StreamController, mpsc::UnboundedReceiver<StreamEvent>) {
        let api = ApiClient::new(
            url::Url::parse("http://127.0.0.1:1/").unwrap(),
            crate::auth::TokenHandle::new(None),
            Duration::from_secs(1),
        )
        .unwrap();
        StreamController::new(api, IDLE)
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let (mut controller, mut rx) = make_controller();
        controller.disconnect();
        controller.disconnect();
        assert!(drain(&mut rx).is_empty());
        assert!(!controller.is_open());
    }

    #[tokio::test]
    async fn test_set_target_none_when_idle_is_noop() {
        let (mut controller, mut rx) = make_controller();
        controller.set_target(None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_set_target_opens_and_disconnect_closes_once() {
        let (mut controller, mut rx) = make_controller();
        let request = ChatStreamRequest {
            query: "hi".into(),
            search_mode: false,
            session_id: None,
            context_pdfs: Vec::new(),
        };

        controller.set_target(Some(request.clone()));
        assert!(controller.is_open());
        assert_eq!(controller.target(), Some(&request));

        controller.disconnect();
        assert!(!controller.is_open());

        // Give the aborted task a moment; it must not deliver anything.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let events = drain(&mut rx);
        let closes = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Closed))
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_set_target_same_target_is_noop() {
        let (mut controller, mut rx) = make_controller();
        let request = ChatStreamRequest {
            query: "hi".into(),
            search_mode: false,
            session_id: Some(1),
            context_pdfs: Vec::new(),
        };

        controller.set_target(Some(request.clone()));
        let _ = drain(&mut rx);
        controller.set_target(Some(request.clone()));

        // No close was emitted: the existing connection was kept.
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, StreamEvent::Closed)));
        assert!(controller.is_open());
    }

    #[tokio::test]
    async fn test_new_target_closes_previous_connection_first() {
        let (mut controller, mut rx) = make_controller();
        let first = ChatStreamRequest {
            query: "first".into(),
            search_mode: false,
            session_id: None,
            context_pdfs: Vec::new(),
        };
        let second = ChatStreamRequest {
            query: "second".into(),
            ..first.clone()
        };

        controller.set_target(Some(first));
        controller.set_target(Some(second.clone()));

        // The first connection's close precedes anything from the second.
        let first_event = rx.recv().await.unwrap();
        assert_eq!(first_event, StreamEvent::Closed);
        assert_eq!(controller.target(), Some(&second));
    }
}
