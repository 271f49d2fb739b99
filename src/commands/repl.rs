//! Slash-command parser for interactive chat
//!
//! Anything starting with `/` is a session-control command; everything
//! else is sent to the assistant. Command words are case-insensitive.

/// A parsed line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Plain input to send to the assistant
    Message(String),

    /// Start a fresh conversation (`/new`)
    NewChat,

    /// List sessions (`/sessions`)
    Sessions,

    /// Switch to another session (`/switch <id>`)
    Switch(i64),

    /// Rename a session (`/rename <id> <name>`)
    Rename(i64, String),

    /// Delete a session (`/delete <id>`)
    Delete(i64),

    /// Toggle web search (`/search on|off`)
    Search(bool),

    /// List uploaded PDFs (`/pdfs`)
    Pdfs,

    /// Add a PDF to the retrieval context (`/attach <pdf-id>`)
    Attach(i64),

    /// Remove a PDF from the retrieval context (`/detach <pdf-id>`)
    Detach(i64),

    /// Show help (`/help`)
    Help,

    /// Leave the chat (`/quit`, `/exit`)
    Quit,

    /// A slash command that could not be parsed; carries the complaint
    Invalid(String),
}

/// Parse one line of REPL input
pub fn parse_repl_command(input: &str) -> ReplCommand {
    let input = input.trim();
    if !input.starts_with('/') {
        return ReplCommand::Message(input.to_string());
    }

    let mut parts = input.splitn(3, char::is_whitespace);
    let command = parts.next().unwrap_or("").to_lowercase();
    let first_arg = parts.next();
    let rest = parts.next();

    match command.as_str() {
        "/new" => ReplCommand::NewChat,
        "/sessions" => ReplCommand::Sessions,
        "/pdfs" => ReplCommand::Pdfs,
        "/help" => ReplCommand::Help,
        "/quit" | "/exit" => ReplCommand::Quit,
        "/switch" => parse_id(first_arg, "/switch <id>").map_or_else(
            ReplCommand::Invalid,
            ReplCommand::Switch,
        ),
        "/delete" => parse_id(first_arg, "/delete <id>").map_or_else(
            ReplCommand::Invalid,
            ReplCommand::Delete,
        ),
        "/attach" => parse_id(first_arg, "/attach <pdf-id>").map_or_else(
            ReplCommand::Invalid,
            ReplCommand::Attach,
        ),
        "/detach" => parse_id(first_arg, "/detach <pdf-id>").map_or_else(
            ReplCommand::Invalid,
            ReplCommand::Detach,
        ),
        "/rename" => match (parse_id(first_arg, "/rename <id> <name>"), rest) {
            (Ok(id), Some(name)) if !name.trim().is_empty() => {
                ReplCommand::Rename(id, name.trim().to_string())
            }
            (Ok(_), _) => ReplCommand::Invalid("Usage: /rename <id> <name>".to_string()),
            (Err(msg), _) => ReplCommand::Invalid(msg),
        },
        "/search" => match first_arg.map(str::to_lowercase).as_deref() {
            Some("on") => ReplCommand::Search(true),
            Some("off") => ReplCommand::Search(false),
            _ => ReplCommand::Invalid("Usage: /search on|off".to_string()),
        },
        other => ReplCommand::Invalid(format!(
            "Unknown command: {}. Type /help for available commands.",
            other
        )),
    }
}

fn parse_id(arg: Option<&str>, usage: &str) -> Result<i64, String> {
    match arg.and_then(|a| a.parse::<i64>().ok()) {
        Some(id) => Ok(id),
        None => Err(format!("Usage: {}", usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_repl_command("What does chapter 2 say?"),
            ReplCommand::Message("What does chapter 2 say?".to_string())
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_repl_command("/new"), ReplCommand::NewChat);
        assert_eq!(parse_repl_command("/sessions"), ReplCommand::Sessions);
        assert_eq!(parse_repl_command("/pdfs"), ReplCommand::Pdfs);
        assert_eq!(parse_repl_command("/help"), ReplCommand::Help);
        assert_eq!(parse_repl_command("/quit"), ReplCommand::Quit);
        assert_eq!(parse_repl_command("/exit"), ReplCommand::Quit);
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(parse_repl_command("/NEW"), ReplCommand::NewChat);
        assert_eq!(parse_repl_command("/Quit"), ReplCommand::Quit);
    }

    #[test]
    fn test_switch_parses_id() {
        assert_eq!(parse_repl_command("/switch 42"), ReplCommand::Switch(42));
        assert!(matches!(
            parse_repl_command("/switch"),
            ReplCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_repl_command("/switch abc"),
            ReplCommand::Invalid(_)
        ));
    }

    #[test]
    fn test_rename_takes_id_and_name() {
        assert_eq!(
            parse_repl_command("/rename 7 Trip planning"),
            ReplCommand::Rename(7, "Trip planning".to_string())
        );
        assert!(matches!(
            parse_repl_command("/rename 7"),
            ReplCommand::Invalid(_)
        ));
        assert!(matches!(
            parse_repl_command("/rename x y"),
            ReplCommand::Invalid(_)
        ));
    }

    #[test]
    fn test_search_toggle() {
        assert_eq!(parse_repl_command("/search on"), ReplCommand::Search(true));
        assert_eq!(
            parse_repl_command("/search off"),
            ReplCommand::Search(false)
        );
        assert!(matches!(
            parse_repl_command("/search maybe"),
            ReplCommand::Invalid(_)
        ));
    }

    #[test]
    fn test_attach_detach() {
        assert_eq!(parse_repl_command("/attach 3"), ReplCommand::Attach(3));
        assert_eq!(parse_repl_command("/detach 3"), ReplCommand::Detach(3));
    }

    #[test]
    fn test_unknown_command_is_invalid() {
        assert!(matches!(
            parse_repl_command("/frobnicate"),
            ReplCommand::Invalid(_)
        ));
    }
}
