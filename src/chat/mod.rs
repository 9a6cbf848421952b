//! Interactive REPL support for CongressGPT chats.
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing
//! - [`render`]: transcript and chat list output

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, password_from_env};
pub use render::{PlainTextRenderer, Renderer, format_chats, format_message};
