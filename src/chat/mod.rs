//! Chat core: the answer stream controller and the session/message store

pub mod store;
pub mod stream;

pub use store::{ChatMessage, ChatStore, Notice, NoticeLevel, SendOutcome};
pub use stream::{StreamController, StreamEvent};
