//! Backend API surface: wire types and the authenticated HTTP client

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    ChatStreamRequest, MessageRecord, PdfDocument, SearchMetadata, SessionDetail, SessionSummary,
    StreamFrame, UserProfile,
};
