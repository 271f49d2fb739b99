//! Command handlers for the Askdoc CLI

pub mod auth;
pub mod chat;
pub mod pdfs;
pub mod repl;
pub mod sessions;

use crate::api::ApiClient;
use crate::auth::TokenHandle;
use crate::config::Config;
use crate::error::Result;

/// Build an API client from config and the persisted token, if any
pub(crate) fn build_client(config: &Config) -> Result<ApiClient> {
    let token = TokenHandle::new(crate::auth::load_stored_token());
    ApiClient::new(
        config.backend.base_url()?,
        token,
        config.backend.request_timeout(),
    )
}
