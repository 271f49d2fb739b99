//! Wire types for the chat backend API
//!
//! These structs mirror the JSON shapes the backend produces and consumes:
//! session summaries and details, persisted messages, the stream request,
//! the two stream frame kinds, PDF documents, and the user profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted message inside a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Server-assigned message id
    pub id: i64,
    /// Message text
    pub content: String,
    /// True for user messages, false for assistant replies
    pub is_user_message: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A chat session as returned by the session list endpoint
///
/// The update endpoint returns the same shape without `message_count`,
/// so that field defaults to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Server-assigned session id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Number of messages in the session
    #[serde(default)]
    pub message_count: usize,
}

/// A chat session with its full message history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    /// Server-assigned session id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Ordered message history (oldest first)
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

/// Request body for starting one chat exchange
///
/// At most one of these is in flight per chat store. `session_id` is
/// omitted for a not-yet-persisted conversation; the server then creates
/// a session and announces its id in the metadata frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    /// The user's question
    pub query: String,
    /// Whether the backend should augment the answer with web search
    pub search_mode: bool,
    /// Session to continue, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    /// Ids of PDFs to use as retrieval context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_pdfs: Vec<i64>,
}

/// Out-of-band data delivered alongside the streamed answer
///
/// The deployed backend spells these fields `search` and
/// `chat_session_id`; both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Summary of web search results backing the answer, if search ran
    #[serde(default, alias = "search", skip_serializing_if = "Option::is_none")]
    pub search_summary: Option<String>,
    /// Session id for the exchange; used to adopt a server-issued id for
    /// a conversation that was not persisted yet
    #[serde(
        default,
        alias = "chat_session_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<i64>,
}

/// One parsed frame of the answer stream, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// Out-of-band metadata, sent before the answer text starts
    Metadata {
        /// The metadata payload
        data: SearchMetadata,
    },
    /// A fragment of the assistant's answer, in arrival order
    AnswerChunk {
        /// The text fragment
        text: String,
    },
}

/// An uploaded PDF document available as retrieval context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDocument {
    /// Server-assigned document id
    pub id: i64,
    /// Original file name
    pub name: String,
    /// Download URL
    pub url: String,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}

/// The signed-in user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned user id
    pub id: i64,
    /// Display name
    pub username: String,
    /// Account email
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_frame_parses() {
        let json = r#"{"type":"metadata","data":{"search_summary":"two results","session_id":42}}"#;
        let frame: StreamFrame = serde_json::from_str(json).unwrap();
        match frame {
            StreamFrame::Metadata { data } => {
                assert_eq!(data.search_summary.as_deref(), Some("two results"));
                assert_eq!(data.session_id, Some(42));
            }
            other => panic!("expected metadata frame, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_frame_accepts_backend_spellings() {
        // The deployed backend emits `search` / `chat_session_id` and an
        // extra `duration` field.
        let json =
            r#"{"type":"metadata","data":{"search":"ctx","duration":0.4,"chat_session_id":7}}"#;
        let frame: StreamFrame = serde_json::from_str(json).unwrap();
        match frame {
            StreamFrame::Metadata { data } => {
                assert_eq!(data.search_summary.as_deref(), Some("ctx"));
                assert_eq!(data.session_id, Some(7));
            }
            other => panic!("expected metadata frame, got {:?}", other),
        }
    }

    #[test]
    fn test_answer_chunk_frame_parses() {
        let json = r#"{"type":"answer_chunk","text":"Hello"}"#;
        let frame: StreamFrame = serde_json::from_str(json).unwrap();
        assert_eq!(
            frame,
            StreamFrame::AnswerChunk {
                text: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_frame_type_is_error() {
        let json = r#"{"type":"heartbeat"}"#;
        assert!(serde_json::from_str::<StreamFrame>(json).is_err());
    }

    #[test]
    fn test_stream_request_omits_empty_fields() {
        let request = ChatStreamRequest {
            query: "What is in chapter 2?".to_string(),
            search_mode: false,
            session_id: None,
            context_pdfs: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("session_id"));
        assert!(!json.contains("context_pdfs"));
        assert!(json.contains("\"search_mode\":false"));
    }

    #[test]
    fn test_stream_request_serializes_context_pdfs() {
        let request = ChatStreamRequest {
            query: "summarize".to_string(),
            search_mode: true,
            session_id: Some(3),
            context_pdfs: vec![10, 11],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"session_id\":3"));
        assert!(json.contains("\"context_pdfs\":[10,11]"));
    }

    #[test]
    fn test_session_summary_message_count_defaults() {
        // The rename endpoint returns summaries without a message count.
        let json = r#"{"id":1,"name":"Trip planning","created_at":"2026-01-02T10:00:00Z"}"#;
        let summary: SessionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.message_count, 0);
    }

    #[test]
    fn test_session_detail_messages_default_empty() {
        let json = r#"{"id":5,"name":"New Chat","created_at":"2026-01-02T10:00:00Z"}"#;
        let detail: SessionDetail = serde_json::from_str(json).unwrap();
        assert!(detail.messages.is_empty());
    }

    #[test]
    fn test_message_record_roundtrip() {
        let record = MessageRecord {
            id: 9,
            content: "Hello".to_string(),
            is_user_message: true,
            created_at: "2026-01-02T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
