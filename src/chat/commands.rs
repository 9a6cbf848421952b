//! Slash command parsing for the chat REPL.
//!
//! Lines that start with `/` control the session and are never sent as
//! queries.

use crate::history::ChatSelection;
use crate::types::{ChatId, LanguageModel, Vote};

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new chat.
    New,

    /// Refresh and list past chats.
    History,

    /// Open a past chat by list position or id.
    Open(ChatSelection),

    /// Switch the model; `None` toggles between the two.
    Model(Option<LanguageModel>),

    /// Vote on a bot message.
    Rate(i64, Vote),

    /// Expand or collapse search results.
    Expand(i64),

    /// Re-send ratings that failed to persist.
    Sync,

    /// Re-render the transcript.
    Show,

    /// Display session status.
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be submitted as a query.
///
/// # Examples
///
/// ```
/// # use congressgpt::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/open 2").is_some());
/// assert!(parse_command("Who chairs the Ways and Means Committee?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "history" | "chats" => ChatCommand::History,
        "open" => match argument {
            Some(arg) => parse_selection(arg),
            None => ChatCommand::Invalid("/open requires a list number or #id".to_string()),
        },
        "model" => match argument {
            None => ChatCommand::Model(None),
            Some(arg) => match arg.parse::<LanguageModel>() {
                Ok(model) => ChatCommand::Model(Some(model)),
                Err(err) => ChatCommand::Invalid(format!("/model {err}")),
            },
        },
        "up" => parse_order(argument, "/up", |order| ChatCommand::Rate(order, Vote::Up)),
        "down" => parse_order(argument, "/down", |order| {
            ChatCommand::Rate(order, Vote::Down)
        }),
        "expand" => parse_order(argument, "/expand", ChatCommand::Expand),
        "sync" => ChatCommand::Sync,
        "show" => ChatCommand::Show,
        "status" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_selection(arg: &str) -> ChatCommand {
    if let Some(id) = arg.strip_prefix('#') {
        return match id.parse::<ChatId>() {
            Ok(chat_id) => ChatCommand::Open(ChatSelection::Id(chat_id)),
            Err(_) => ChatCommand::Invalid(format!("/open expects a chat id, got #{id}")),
        };
    }
    match arg.parse::<usize>() {
        Ok(number) if number >= 1 => ChatCommand::Open(ChatSelection::Index(number - 1)),
        _ => ChatCommand::Invalid("/open expects a list number starting at 1".to_string()),
    }
}

fn parse_order<F>(argument: Option<&str>, name: &str, constructor: F) -> ChatCommand
where
    F: Fn(i64) -> ChatCommand,
{
    match argument {
        Some(arg) => match arg.parse::<i64>() {
            Ok(order) if order >= 0 => constructor(order),
            _ => ChatCommand::Invalid(format!("{} expects a message number", name)),
        },
        None => ChatCommand::Invalid(format!("{} requires a message number", name)),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /history               Refresh and list past chats
  /open <n|#id>          Open chat n from the list, or chat #id
  /model [name]          Set the model (no argument toggles)
  /up <n>                Vote up bot message n (again to clear)
  /down <n>              Vote down bot message n (again to clear)
  /expand <n>            Expand or collapse search results in message n
  /sync                  Retry ratings that failed to save
  /show                  Show the transcript again
  /status                Show session status
  /help                  Show this help message
  /quit                  Exit the chat"#
}
