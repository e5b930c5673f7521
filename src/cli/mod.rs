//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod account;
pub mod chat;
pub mod context;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::api::ProfilePatch;
use crate::cli::account::RegisterInput;
use crate::cli::context::AppContext;
use crate::core::config::data::{path_display, Config};
use crate::utils::logging::init_tracing;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");

#[derive(Parser)]
#[command(name = "nova")]
#[command(version = VERSION)]
#[command(about = "Talk to the NOVA assistant from your terminal")]
#[command(
    long_about = "NOVA keeps your login, your conversations and their history on this machine \
and talks to the NOVA backend for replies.\n\n\
Environment Variables:\n\
  NOVA_API_BASE_URL   Backend root (defaults to http://localhost:8000/api)\n\
  NOVA_LOG            Log filter, e.g. 'nova=debug' (defaults to 'warn')"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with an existing account
    Login {
        username: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Forget the stored login
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Manage your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show the effective configuration
    Config {
        /// Write a starter config file if none exists
        #[arg(long)]
        init: bool,
    },
    /// Work with conversations
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Update profile fields
    Set {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// Start a new conversation
    New,
    /// List conversations, newest first
    List,
    /// Switch to a conversation and print its history
    Open { id: String },
    /// Send a message to the active conversation
    Send {
        /// Message text (can be multiple words)
        text: Vec<String>,
        /// Attach a file (repeatable)
        #[arg(short = 'f', long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },
    /// Ask again for the reply to a message
    Regenerate { message_id: String },
    /// Copy the conversation, or one exchange, to the clipboard
    Share {
        #[arg(long = "message", value_name = "ID")]
        message_id: Option<String>,
    },
    /// Write the paginated transcript to a file
    Export {
        path: PathBuf,
        /// Replace the file if it exists
        #[arg(long)]
        force: bool,
    },
    /// Empty the active conversation's history
    Clear,
    /// Remove a conversation for good
    Delete { id: String },
    /// Print the active conversation
    History,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if let Err(err) = run(args.command).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
    Ok(())
}

fn show_config(config: &Config, init: bool) -> Result<(), Box<dyn Error>> {
    if init {
        let path = Config::config_path().ok_or("Could not determine the config directory")?;
        if path.exists() {
            println!("Config already exists at {}", path_display(&path));
        } else {
            config.save_to_path(&path)?;
            println!("✅ Wrote {}", path_display(&path));
        }
    }
    config.print_all();
    Ok(())
}

async fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    if let Commands::Config { init } = command {
        return show_config(&config, init);
    }

    let mut ctx = AppContext::from_config(config)?;
    let result = dispatch(&mut ctx, command).await;
    ctx.auth.dispose();
    result
}

async fn dispatch(ctx: &mut AppContext, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Login { username, password } => account::login(ctx, username, password).await,
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let input = RegisterInput {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            account::register(ctx, input).await
        }
        Commands::Logout => {
            account::logout(ctx);
            Ok(())
        }
        Commands::Whoami => account::whoami(ctx).await,
        Commands::Refresh => account::refresh(ctx).await,
        Commands::Profile {
            command:
                ProfileCommands::Set {
                    first_name,
                    last_name,
                    bio,
                },
        } => {
            let patch = ProfilePatch {
                first_name,
                last_name,
                bio,
            };
            account::update_profile(ctx, patch).await
        }
        Commands::Config { .. } => Ok(()),
        Commands::Chat { command } => {
            ctx.require_chat_access().await?;
            run_chat_command(ctx, command).await
        }
    }
}

async fn run_chat_command(ctx: &AppContext, command: ChatCommands) -> Result<(), Box<dyn Error>> {
    match command {
        ChatCommands::New => chat::new_session(ctx),
        ChatCommands::List => {
            chat::list(ctx);
            Ok(())
        }
        ChatCommands::Open { id } => chat::open(ctx, &id),
        ChatCommands::Send { text, files } => chat::send(ctx, &text.join(" "), &files).await,
        ChatCommands::Regenerate { message_id } => chat::regenerate(ctx, &message_id).await,
        ChatCommands::Share { message_id } => chat::share(ctx, message_id.as_deref()),
        ChatCommands::Export { path, force } => chat::export(ctx, &path, force),
        ChatCommands::Clear => chat::clear(ctx),
        ChatCommands::Delete { id } => chat::delete(ctx, &id),
        ChatCommands::History => chat::history(ctx),
    }
}

#[cfg(test)]
mod tests;
