//! Interactive chat client for CongressGPT.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and chat against a local backend
//! CONGRESSGPT_SUPABASE_URL=https://project.supabase.co \
//! CONGRESSGPT_SUPABASE_KEY=... \
//! congressgpt-chat --email me@example.com
//!
//! # Use a config file and the faster model
//! congressgpt-chat --config congressgpt.yaml --model gpt-3.5-turbo-1106
//! ```
//!
//! Set `RUST_LOG=congressgpt=debug` to see request logs on stderr.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use congressgpt::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
    password_from_env,
};
use congressgpt::{
    ChatController, CongressGpt, HistorySelector, Phase, SessionManager, SupabaseAuth,
    SupabaseRatings,
};

/// Main entry point for the congressgpt-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("congressgpt-chat [OPTIONS]");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ChatConfig::resolve(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    let (supabase_url, supabase_key) = config.supabase()?;
    let auth = SupabaseAuth::with_options(supabase_url, supabase_key, Some(config.timeout()))?;
    let session = SessionManager::new(Arc::new(auth));

    let email = match config.email.clone() {
        Some(email) => email,
        None => rl.readline("Email: ")?.trim().to_string(),
    };
    let password = match password_from_env() {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };
    session.sign_in(&email, &password).await?;

    let client = CongressGpt::with_options(&config.api_base, Some(config.timeout()))?;
    let ratings = SupabaseRatings::with_options(supabase_url, supabase_key, Some(config.timeout()))?;
    let controller = ChatController::new(client.clone(), session.clone(), Arc::new(ratings));
    controller.set_model(config.model);
    let mut history = HistorySelector::new(client);

    println!("CongressGPT (model: {}, signed in as {email})", controller.model());
    println!("Type /help for commands, /quit to exit\n");
    if let Err(err) = history.refresh(&session, controller.highest_chat_id()).await {
        renderer.print_error(&format!("Could not load chats: {err}"));
    } else if !history.chats().is_empty() {
        renderer.print_chats(history.chats(), controller.chat_id());
        println!();
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => break,
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::New => match controller.start_new_chat().await {
                            Ok(()) => renderer.print_info("Started a new chat."),
                            Err(err) => renderer
                                .print_error(&format!("New chat started, but: {err}")),
                        },
                        ChatCommand::History => {
                            match history
                                .force_refresh(&session, controller.highest_chat_id())
                                .await
                            {
                                Ok(()) => {
                                    renderer.print_chats(history.chats(), controller.chat_id())
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Could not load chats: {err}")),
                            }
                        }
                        ChatCommand::Open(selection) => {
                            match history.select(&controller, selection).await {
                                Ok(messages) => renderer.print_transcript(&messages),
                                Err(err) => renderer
                                    .print_error(&format!("Could not open chat: {err}")),
                            }
                        }
                        ChatCommand::Model(model) => {
                            let model = model.unwrap_or_else(|| controller.model().toggle());
                            controller.set_model(model);
                            renderer.print_info(&format!("Model changed to: {model}"));
                        }
                        ChatCommand::Rate(order, vote) => {
                            match controller.set_rating(order, vote).await {
                                Ok(rating) => renderer
                                    .print_info(&format!("Message {order} rated {rating}.")),
                                Err(err) => renderer
                                    .print_error(&format!("Rating not saved: {err}")),
                            }
                        }
                        ChatCommand::Expand(order) => match controller.toggle_open(order) {
                            Ok(_) => {
                                if let Some(message) = controller
                                    .messages()
                                    .iter()
                                    .find(|message| message.order_in_chat == order)
                                {
                                    renderer.print_message(message);
                                }
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Sync => match controller.resync_ratings().await {
                            Ok(synced) => {
                                renderer.print_info(&format!("{synced} rating(s) saved."))
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Show => renderer.print_transcript(&controller.messages()),
                        ChatCommand::Status => print_status(&controller, &session),
                        ChatCommand::Invalid(message) => renderer.print_error(&message),
                    }
                    continue;
                }

                match controller.submit_query(line).await {
                    Ok(messages) => {
                        for message in &messages {
                            renderer.print_message(message);
                        }
                        if let Err(err) =
                            history.refresh(&session, controller.highest_chat_id()).await
                        {
                            tracing::warn!(error = %err, "chat list refresh failed");
                        }
                    }
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    if let Err(err) = session.sign_out().await {
        tracing::warn!(error = %err, "sign out failed");
    }
    println!("\nGoodbye!");
    Ok(())
}

fn print_status(controller: &ChatController, session: &SessionManager) {
    let messages = controller.messages();
    let unsynced = messages
        .iter()
        .filter(|message| message.rating_sync.is_unsynced())
        .count();
    println!("    Session Status:");
    println!(
        "      Signed in as: {}",
        session.user_email().unwrap_or_else(|| "(unknown)".to_string())
    );
    println!("      Model: {}", controller.model());
    match controller.chat_id() {
        Some(chat_id) => println!("      Chat: #{chat_id}"),
        None => println!("      Chat: (new)"),
    }
    println!("      Messages: {}", messages.len());
    println!("      Unsaved ratings: {unsynced}");
    let phase = match controller.phase() {
        Phase::Idle => "idle",
        Phase::Pending => "waiting for a reply",
        Phase::LoadingHistory => "loading a chat",
    };
    println!("      State: {phase}");
}
