//! Sign-in, sign-out, and profile commands
//!
//! The backend trusts bearer tokens minted by an external identity
//! provider; `login` validates the pasted token against `/auth/me` before
//! persisting it in the OS keyring.

use colored::Colorize;
use rustyline::DefaultEditor;

use crate::api::ApiClient;
use crate::auth::TokenHandle;
use crate::config::Config;
use crate::error::Result;

/// Sign in with an access token
///
/// Prompts for the token when not given on the command line. The token is
/// validated with a profile fetch before it is stored; an invalid token is
/// never persisted.
pub async fn login(config: &Config, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            let mut editor = DefaultEditor::new()?;
            editor.readline("Paste your access token: ")?
        }
    };
    let token = token.trim().to_string();

    let handle = TokenHandle::new(Some(token.clone()));
    let client = ApiClient::new(
        config.backend.base_url()?,
        handle,
        config.backend.request_timeout(),
    )?;

    let profile = client.me().await?;
    crate::auth::store_token(&token)?;

    println!(
        "{}",
        format!("Signed in as {} <{}>", profile.username, profile.email).green()
    );
    Ok(())
}

/// Sign out and forget the stored token
pub fn logout() -> Result<()> {
    crate::auth::clear_stored_token()?;
    println!("{}", "Signed out.".green());
    Ok(())
}

/// Show the signed-in user's profile
pub async fn whoami(config: &Config) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    if !client.token().is_authenticated() {
        println!("{}", "Not signed in. Run `askdoc login` first.".yellow());
        return Ok(());
    }

    let profile = client.me().await?;
    println!("{} ({})", profile.username.bold(), profile.email);
    Ok(())
}
