//! Askdoc - terminal client for a document-Q&A chat backend
//!
//! This library provides the core functionality for the Askdoc client:
//! the authenticated transport, the answer stream controller, and the
//! session/message store the CLI is built on.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: wire types and the authenticated HTTP client
//! - `chat`: the stream controller and the session/message store
//! - `auth`: bearer token handling and keyring persistence
//! - `commands`: CLI command handlers (chat REPL, sessions, PDFs, login)
//! - `config`: configuration loading and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use askdoc::{ApiClient, ChatStore, Config, TokenHandle};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let api = ApiClient::new(
//!         config.backend.base_url()?,
//!         TokenHandle::new(None),
//!         config.backend.request_timeout(),
//!     )?;
//!     let mut store = ChatStore::new(api, &config.chat);
//!     store.send_message("What does chapter 2 cover?");
//!     while store.is_loading() {
//!         if let Some(event) = store.next_stream_event().await {
//!             store.apply_stream_event(event);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use api::ApiClient;
pub use auth::TokenHandle;
pub use chat::{ChatMessage, ChatStore, SendOutcome, StreamController, StreamEvent};
pub use config::Config;
pub use error::{AskdocError, Result};
