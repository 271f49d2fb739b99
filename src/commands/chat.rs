//! Interactive chat session
//!
//! The REPL reads a line, parses slash commands, and otherwise sends the
//! line as a message, printing answer fragments as they stream in. Session
//! management never runs while an exchange is in flight: the loop pumps
//! every exchange to completion before prompting again, which also keeps
//! the store's in-flight guards out of the happy path.

use std::io::Write as _;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::auth::TokenHandle;
use crate::chat::{ChatStore, Notice, NoticeLevel, SendOutcome, StreamEvent};
use crate::commands::repl::{parse_repl_command, ReplCommand};
use crate::config::Config;
use crate::error::Result;

/// Run the interactive chat loop
///
/// # Arguments
///
/// * `config` - Loaded application configuration.
/// * `session` - Session to resume, if any.
/// * `search` - Start with web search enabled.
pub async fn run_chat(config: Config, session: Option<i64>, search: bool) -> Result<()> {
    let token = TokenHandle::new(crate::auth::load_stored_token());
    let api = crate::api::ApiClient::new(
        config.backend.base_url()?,
        token,
        config.backend.request_timeout(),
    )?;
    let mut store = ChatStore::new(api, &config.chat);

    if search {
        store.set_search_mode(true);
    }

    store.load_sessions().await;
    if let Some(session_id) = session {
        store.switch_session(session_id).await;
    }
    flush_notices(&mut store);

    print_banner(&store);

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match parse_repl_command(input) {
            ReplCommand::Quit => break,
            ReplCommand::Help => print_help(),
            ReplCommand::NewChat => {
                store.create_new_chat();
                println!("{}", "Started a new chat.".green());
            }
            ReplCommand::Sessions => {
                store.load_sessions().await;
                print_sessions(&store);
            }
            ReplCommand::Switch(id) => {
                if store.switch_session(id).await {
                    println!("{}", format!("Switched to session {}.", id).green());
                } else {
                    println!("{}", "Cannot switch sessions while sending.".yellow());
                }
            }
            ReplCommand::Rename(id, name) => store.rename_session(id, &name).await,
            ReplCommand::Delete(id) => store.delete_session(id).await,
            ReplCommand::Search(on) => {
                store.set_search_mode(on);
                let state = if on { "enabled" } else { "disabled" };
                println!("{}", format!("Web search {}.", state).green());
            }
            ReplCommand::Pdfs => print_pdfs(&store).await,
            ReplCommand::Attach(pdf_id) => {
                store.select_pdf(pdf_id);
                println!(
                    "{}",
                    format!("PDF {} added to retrieval context.", pdf_id).green()
                );
            }
            ReplCommand::Detach(pdf_id) => {
                store.deselect_pdf(pdf_id);
                println!(
                    "{}",
                    format!("PDF {} removed from retrieval context.", pdf_id).green()
                );
            }
            ReplCommand::Invalid(message) => println!("{}", message.red()),
            ReplCommand::Message(text) => drive_exchange(&mut store, &text).await,
        }

        flush_notices(&mut store);
    }

    println!("{}", "Bye.".dimmed());
    Ok(())
}

/// Dispatch one message and pump its stream to completion
async fn drive_exchange(store: &mut ChatStore, text: &str) {
    match store.send_message(text) {
        SendOutcome::Ignored => return,
        SendOutcome::SignInRequired => {
            println!(
                "{}",
                "Message limit reached. Run `askdoc login` to keep chatting.".yellow()
            );
            return;
        }
        SendOutcome::Dispatched => {}
    }

    let mut printed_prefix = false;
    while store.is_loading() {
        let Some(event) = store.next_stream_event().await else {
            break;
        };

        match &event {
            StreamEvent::Chunk(fragment) => {
                if !printed_prefix {
                    print!("{} ", "assistant>".cyan().bold());
                    printed_prefix = true;
                }
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Errored(_) => {
                if printed_prefix {
                    println!();
                    printed_prefix = false;
                }
            }
            _ => {}
        }

        store.apply_stream_event(event);
    }

    if printed_prefix {
        println!();
    }

    if let Some(summary) = store.search_summary() {
        println!("{} {}", "sources:".dimmed(), summary.dimmed());
    }
}

fn print_banner(store: &ChatStore) {
    println!("{}", "askdoc interactive chat".bold());
    if !store.authenticated() {
        println!(
            "{}",
            "You are chatting as a guest; run `askdoc login` for sessions and history.".yellow()
        );
    }
    println!("Type a question, or /help for commands.\n");
}

fn print_help() {
    println!("Available commands:");
    println!("  {}              start a fresh conversation", "/new".cyan());
    println!("  {}         list your chat sessions", "/sessions".cyan());
    println!("  {}      switch to another session", "/switch <id>".cyan());
    println!("  {} rename a session", "/rename <id> <name>".cyan());
    println!("  {}      delete a session", "/delete <id>".cyan());
    println!("  {}    toggle web search", "/search on|off".cyan());
    println!("  {}             list uploaded PDFs", "/pdfs".cyan());
    println!("  {}   use a PDF as context", "/attach <pdf-id>".cyan());
    println!("  {}   stop using a PDF", "/detach <pdf-id>".cyan());
    println!("  {}             leave the chat", "/quit".cyan());
}

fn print_sessions(store: &ChatStore) {
    if store.sessions().is_empty() {
        println!("{}", "No chat sessions yet.".yellow());
        return;
    }
    for session in store.sessions() {
        let marker = if Some(session.id) == store.current_session_id() {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>5}  {}  ({} messages)",
            marker,
            session.id.to_string().cyan(),
            session.name,
            session.message_count
        );
    }
}

async fn print_pdfs(store: &ChatStore) {
    match store.api().list_pdfs().await {
        Ok(pdfs) if pdfs.is_empty() => println!("{}", "No PDFs uploaded yet.".yellow()),
        Ok(pdfs) => {
            for pdf in pdfs {
                let selected = if store.context_pdfs().contains(&pdf.id) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:>5}  {}", selected, pdf.id.to_string().cyan(), pdf.name);
            }
        }
        Err(e) => println!("{}", format!("Failed to list PDFs: {}", e).red()),
    }
}

/// Print and clear any notices the store accumulated
fn flush_notices(store: &mut ChatStore) {
    for Notice { level, text } in store.take_notices() {
        match level {
            NoticeLevel::Info => println!("{}", text.green()),
            NoticeLevel::Error => println!("{}", text.red()),
        }
    }
}
