//! Askdoc - terminal client for a document-Q&A chat backend
//!
#![doc = "Askdoc - chat with your documents from the terminal"]
#![doc = "Main entry point for the Askdoc client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use askdoc::cli::{Cli, Commands, PdfCommand, SessionCommand};
use askdoc::commands;
use askdoc::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load and validate configuration
    let config = Config::load(&cli.config)?;
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session, search } => {
            tracing::info!("Starting interactive chat");
            if let Some(id) = session {
                tracing::debug!("Resuming session: {}", id);
            }
            if search {
                tracing::debug!("Web search enabled");
            }

            commands::chat::run_chat(config, session, search).await?;
            Ok(())
        }
        Commands::Login { token } => {
            commands::auth::login(&config, token).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout()?;
            Ok(())
        }
        Commands::Whoami => {
            commands::auth::whoami(&config).await?;
            Ok(())
        }
        Commands::Sessions { command } => match command {
            SessionCommand::List { json } => {
                commands::sessions::list_sessions(&config, json).await?;
                Ok(())
            }
            SessionCommand::Rename { id, name } => {
                commands::sessions::rename_session(&config, id, &name).await?;
                Ok(())
            }
            SessionCommand::Delete { id } => {
                commands::sessions::delete_session(&config, id).await?;
                Ok(())
            }
        },
        Commands::Pdfs { command } => match command {
            PdfCommand::Upload { file } => {
                commands::pdfs::upload(&config, &file).await?;
                Ok(())
            }
            PdfCommand::List { json } => {
                commands::pdfs::list(&config, json).await?;
                Ok(())
            }
            PdfCommand::Attach { session, pdf } => {
                commands::pdfs::attach(&config, session, pdf).await?;
                Ok(())
            }
            PdfCommand::Detach { session, pdf } => {
                commands::pdfs::detach(&config, session, pdf).await?;
                Ok(())
            }
            PdfCommand::Session { id } => {
                commands::pdfs::session_pdfs(&config, id).await?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `--verbose` raises the default level to debug; an explicit `RUST_LOG`
/// still wins.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "askdoc=debug" } else { "askdoc=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
