//! Output rendering for the chat application.
//!
//! Messages are printed with their label and position so that `/up`, `/down`
//! and `/expand` can refer to them.  Search results stay collapsed to a
//! one-line summary until the message is opened.

use std::io::{self, Stdout, Write};

use crate::types::{ChatId, ChatSummary, Message, MessageContent, Rating, RatingSync};

/// ANSI escape code for dim text (used for metadata).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for user labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for search labels).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for bot labels).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and unsynced ratings).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one message.
    fn print_message(&mut self, message: &Message);

    /// Print a whole transcript.
    fn print_transcript(&mut self, messages: &[Message]) {
        if messages.is_empty() {
            self.print_info("(empty chat)");
        }
        for message in messages {
            self.print_message(message);
        }
    }

    /// Print the chat list, marking the active chat.
    fn print_chats(&mut self, chats: &[ChatSummary], active: Option<ChatId>);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!("{}", format_message(message, self.use_color));
        self.flush();
    }

    fn print_chats(&mut self, chats: &[ChatSummary], active: Option<ChatId>) {
        print!("{}", format_chats(chats, active, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }
}

/// Formats a message as its header line followed by its body.
pub fn format_message(message: &Message, use_color: bool) -> String {
    let label = message.label();
    let mut header = format!("[{}] {}", message.order_in_chat, label);
    if use_color {
        let color = match label {
            "User" => ANSI_CYAN,
            "Search Query" | "Search Results" => ANSI_YELLOW,
            _ => ANSI_GREEN,
        };
        header = format!("{ANSI_BOLD}{color}{header}{ANSI_RESET}");
    }
    if message.is_ratable() {
        let rating = rating_marker(message);
        if use_color && message.rating_sync.is_unsynced() {
            header.push_str(&format!(" {ANSI_RED}{rating}{ANSI_RESET}"));
        } else if use_color {
            header.push_str(&format!(" {ANSI_DIM}{rating}{ANSI_RESET}"));
        } else {
            header.push(' ');
            header.push_str(&rating);
        }
    }

    let body = match &message.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::SearchResults(results) if !message.is_open => {
            let hint = format!(
                "({} result{}; /expand {} to show)",
                results.len(),
                if results.len() == 1 { "" } else { "s" },
                message.order_in_chat
            );
            if use_color {
                format!("{ANSI_DIM}{hint}{ANSI_RESET}")
            } else {
                hint
            }
        }
        MessageContent::SearchResults(results) => results
            .iter()
            .map(|result| result.text())
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    format!("{header}\n{body}\n")
}

fn rating_marker(message: &Message) -> String {
    let vote = match message.rating {
        Rating::Up => "[+1]",
        Rating::Down => "[-1]",
        Rating::Neutral => "[ 0]",
    };
    match &message.rating_sync {
        RatingSync::Synced => vote.to_string(),
        RatingSync::Pending => format!("{vote} saving"),
        RatingSync::Unsynced(_) => format!("{vote} not saved; /sync to retry"),
    }
}

/// Formats the chat list as numbered lines.
pub fn format_chats(chats: &[ChatSummary], active: Option<ChatId>, use_color: bool) -> String {
    if chats.is_empty() {
        return "(no chats yet)\n".to_string();
    }
    let mut out = String::new();
    for (index, chat) in chats.iter().enumerate() {
        let title = if chat.title.is_empty() {
            "(untitled)"
        } else {
            chat.title.as_str()
        };
        let is_active = active == Some(chat.chat_id);
        let marker = if is_active { "*" } else { " " };
        let line = format!("{marker}{:>3}. {title} #{}", index + 1, chat.chat_id);
        if use_color && is_active {
            out.push_str(&format!("{ANSI_BOLD}{line}{ANSI_RESET}\n"));
        } else {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;

    fn search_results(is_open: bool) -> Message {
        let mut message = Message::from_wire(
            Author::Bot,
            "[{'title': 'H.R. 1', 'summary': '<b>Tax</b> bill'}, {'title': 'S. 2', 'summary': 'Farm bill'}]"
                .to_string(),
            2,
            None,
            false,
            true,
            Rating::Neutral,
        );
        message.is_open = is_open;
        message
    }

    #[test]
    fn renderer_default_has_color() {
        assert!(PlainTextRenderer::new().use_color);
        assert!(!PlainTextRenderer::with_color(false).use_color);
    }

    #[test]
    fn user_messages_have_no_rating() {
        let text = format_message(&Message::user("What is cloture?", 0, None), false);
        assert_eq!(text, "[0] User\nWhat is cloture?\n");
    }

    #[test]
    fn bot_messages_show_rating_state() {
        let mut message = Message::from_wire(
            Author::Bot,
            "A vote to end debate.".to_string(),
            1,
            None,
            false,
            false,
            Rating::Up,
        );
        assert!(format_message(&message, false).starts_with("[1] GPT [+1]\n"));
        message.rating_sync = RatingSync::Unsynced("boom".to_string());
        assert!(format_message(&message, false).contains("not saved"));
    }

    #[test]
    fn search_results_collapse_until_opened() {
        let collapsed = format_message(&search_results(false), false);
        assert!(collapsed.contains("2 results; /expand 2 to show"));
        assert!(!collapsed.contains("Farm bill"));

        let open = format_message(&search_results(true), false);
        assert!(open.contains("Farm bill"));
        assert!(!open.contains("<b>"));
    }

    #[test]
    fn chat_list_marks_active() {
        let chats = vec![
            ChatSummary {
                chat_id: ChatId::new(9).unwrap(),
                title: "Filibusters".to_string(),
            },
            ChatSummary {
                chat_id: ChatId::new(4).unwrap(),
                title: String::new(),
            },
        ];
        let text = format_chats(&chats, ChatId::new(4).ok(), false);
        assert_eq!(text, "   1. Filibusters #9\n*  2. (untitled) #4\n");
        assert_eq!(format_chats(&[], None, false), "(no chats yet)\n");
    }
}
