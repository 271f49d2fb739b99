//! Bearer token handling for Askdoc
//!
//! The backend expects an `Authorization: Bearer <token>` header on every
//! request from a signed-in user. The token itself is minted by an external
//! identity provider and refreshed out-of-band; this module only carries it.
//!
//! [`TokenHandle`] is a shared, settable cell the transport client reads at
//! request time. Whoever refreshes the token (the login command, or any
//! embedding application) calls [`TokenHandle::set`] and every subsequent
//! request picks up the new value. The CLI persists the token in the OS
//! keyring between runs.

use crate::error::{AskdocError, Result};
use std::sync::{Arc, RwLock};

/// Keyring service name for the stored backend token
const KEYRING_SERVICE: &str = "askdoc";
/// Keyring user name for the stored backend token
const KEYRING_USER: &str = "backend";

/// Shared handle to the current bearer token
///
/// Cloning the handle shares the underlying cell, so a token refresh
/// through any clone is visible to all of them.
///
/// # Examples
///
/// ```
/// use askdoc::auth::TokenHandle;
///
/// let handle = TokenHandle::new(None);
/// assert!(!handle.is_authenticated());
///
/// handle.set(Some("tok_123".to_string()));
/// assert_eq!(handle.get(), Some("tok_123".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenHandle {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenHandle {
    /// Create a handle holding `initial`
    pub fn new(initial: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Current token, if any
    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap().clone()
    }

    /// Replace the current token
    ///
    /// `None` signs the client out; requests fall back to guest access.
    pub fn set(&self, token: Option<String>) {
        *self.inner.write().unwrap() = token;
    }

    /// Whether a token is currently held
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().unwrap().is_some()
    }
}

/// Load the persisted token from the OS keyring, if one was stored
///
/// Absence and keyring failures both yield `None`; a broken keyring should
/// degrade to guest access, not prevent startup.
pub fn load_stored_token() -> Option<String> {
    match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        Ok(entry) => match entry.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!("failed to read stored token: {}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("keyring unavailable: {}", e);
            None
        }
    }
}

/// Persist a token to the OS keyring
pub fn store_token(token: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(AskdocError::Keyring)?;
    entry.set_password(token).map_err(AskdocError::Keyring)?;
    Ok(())
}

/// Remove the persisted token from the OS keyring
///
/// Clearing a token that was never stored is a no-op.
pub fn clear_stored_token() -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(AskdocError::Keyring)?;
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AskdocError::Keyring(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_handle_holds_initial_token() {
        let handle = TokenHandle::new(Some("tok".into()));
        assert!(handle.is_authenticated());
        assert_eq!(handle.get(), Some("tok".to_string()));
    }

    #[test]
    fn test_default_handle_is_signed_out() {
        let handle = TokenHandle::default();
        assert!(!handle.is_authenticated());
        assert_eq!(handle.get(), None);
    }

    #[test]
    fn test_set_replaces_token() {
        let handle = TokenHandle::new(Some("old".into()));
        handle.set(Some("new".into()));
        assert_eq!(handle.get(), Some("new".to_string()));
    }

    #[test]
    fn test_set_none_signs_out() {
        let handle = TokenHandle::new(Some("tok".into()));
        handle.set(None);
        assert!(!handle.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let handle = TokenHandle::new(None);
        let clone = handle.clone();

        handle.set(Some("refreshed".into()));
        assert_eq!(clone.get(), Some("refreshed".to_string()));
    }
}
