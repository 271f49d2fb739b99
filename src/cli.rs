//! Command-line interface definition for Askdoc
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session management, PDF
//! management, and sign-in.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Askdoc - chat with your documents from the terminal
///
/// Streams assistant answers from a retrieval-augmented chat backend,
/// with session history and PDF context management.
#[derive(Parser, Debug, Clone)]
#[command(name = "askdoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Askdoc
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume an existing session by id
        #[arg(short, long)]
        session: Option<i64>,

        /// Enable web search for answers
        #[arg(long)]
        search: bool,
    },

    /// Sign in with a backend access token
    Login {
        /// The access token; prompted for interactively when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in user's profile
    Whoami,

    /// Manage chat sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Manage PDFs used as retrieval context
    Pdfs {
        /// PDF management subcommand
        #[command(subcommand)]
        command: PdfCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List your chat sessions
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rename a session
    Rename {
        /// Session id
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a session and all its messages
    Delete {
        /// Session id
        id: i64,
    },
}

/// PDF management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PdfCommand {
    /// Upload a PDF
    Upload {
        /// Path to the PDF file
        file: PathBuf,
    },

    /// List your uploaded PDFs
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Attach a PDF to a session
    Attach {
        /// Session id
        #[arg(short, long)]
        session: i64,

        /// PDF id
        #[arg(short, long)]
        pdf: i64,
    },

    /// Detach a PDF from a session
    Detach {
        /// Session id
        #[arg(short, long)]
        session: i64,

        /// PDF id
        #[arg(short, long)]
        pdf: i64,
    },

    /// List the PDFs attached to a session
    Session {
        /// Session id
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
