//! Tabmate CLI — the main entry point.
//!
//! Commands:
//! - `render`   — Stream markdown through the renderer and print HTML
//! - `context`  — Assemble the budgeted message list for a new message
//! - `record`   — Store a completed turn
//! - `page`     — Store page content and attachments for a session
//! - `turns`    — List the stored turns of a session
//! - `clear`    — Forget a session (or everything)
//! - `config`   — Show, validate or initialize configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tabmate",
    about = "Tabmate — streaming markdown and budgeted chat context",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render markdown (file or stdin) as it would stream in, print HTML
    Render {
        /// Read from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Characters per simulated chunk
        #[arg(short, long)]
        chunk_size: Option<usize>,

        /// Title for code blocks without a language line
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Assemble the context for a new message
    Context {
        #[arg(short, long)]
        session: String,

        /// The new user message
        #[arg(short, long)]
        message: String,

        /// Turn number (defaults to the next one)
        #[arg(short, long)]
        turn: Option<u32>,

        /// System instructions
        #[arg(long)]
        system: Option<String>,

        /// Print metadata alongside the messages
        #[arg(long)]
        metadata: bool,
    },

    /// Record a completed turn
    Record {
        #[arg(short, long)]
        session: String,

        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        assistant: String,

        /// Turn number (defaults to the next one)
        #[arg(short, long)]
        turn: Option<u32>,
    },

    /// Store page content and attachments for a session
    Page {
        #[arg(short, long)]
        session: String,

        /// Page text file (stdin when omitted and no attachments are given)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Attach a text file (repeatable)
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// List stored turns of a session
    Turns {
        #[arg(short, long)]
        session: String,

        /// How many recent turns to show in full
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },

    /// Forget a session, or every session with --all
    Clear {
        #[arg(short, long, required_unless_present = "all")]
        session: Option<String>,

        #[arg(long)]
        all: bool,

        /// Required with --all
        #[arg(long)]
        confirm: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            input,
            chunk_size,
            title,
        } => commands::render::run(input, chunk_size, title).await?,
        Commands::Context {
            session,
            message,
            turn,
            system,
            metadata,
        } => commands::context::run(&session, &message, turn, system.as_deref(), metadata).await?,
        Commands::Record {
            session,
            user,
            assistant,
            turn,
        } => commands::record::run(&session, &user, &assistant, turn).await?,
        Commands::Page {
            session,
            file,
            attachments,
        } => commands::page::run(&session, file, attachments).await?,
        Commands::Turns { session, limit } => commands::turns::run(&session, limit).await?,
        Commands::Clear {
            session,
            all,
            confirm,
        } => commands::clear::run(session.as_deref(), all, confirm).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
        },
    }

    Ok(())
}
