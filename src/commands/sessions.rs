//! Session management commands

use colored::Colorize;
use prettytable::{format, Table};

use crate::config::Config;
use crate::error::Result;

/// List the signed-in user's chat sessions
pub async fn list_sessions(config: &Config, json: bool) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    let sessions = client.list_sessions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", "No chat sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for session in sessions {
        let name = if session.name.len() > 40 {
            format!("{}...", &session.name[..37])
        } else {
            session.name
        };
        let created = session.created_at.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            session.id.to_string().cyan(),
            name,
            session.message_count,
            created
        ]);
    }

    println!("\nChat Sessions:");
    table.printstd();
    println!();
    println!(
        "Use {} to continue a session.",
        "askdoc chat --session <ID>".cyan()
    );
    println!();

    Ok(())
}

/// Rename a session
pub async fn rename_session(config: &Config, id: i64, name: &str) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    let updated = client.rename_session(id, name).await?;
    println!(
        "{}",
        format!("Renamed session {} to \"{}\"", updated.id, updated.name).green()
    );
    Ok(())
}

/// Delete a session and all its messages
pub async fn delete_session(config: &Config, id: i64) -> Result<()> {
    let client = crate::commands::build_client(config)?;
    client.delete_session(id).await?;
    println!("{}", format!("Deleted session {}", id).green());
    Ok(())
}
