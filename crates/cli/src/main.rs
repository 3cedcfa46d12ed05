//! Codewright CLI, the main entry point.
//!
//! Commands:
//! - `chat`: Interactive session with slash commands
//! - `ask`: Single message, optionally through the request pipeline
//! - `tools`: List the built-in tools
//! - `init`: Write a starter config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Overrides;

#[derive(Parser)]
#[command(
    name = "codewright",
    about = "Codewright: AI coding assistant with tools and planning",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (default: ~/.codewright/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured provider
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Override the configured model
    #[arg(long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Use the plain tool loop instead of the planner
        #[arg(long)]
        standard: bool,

        /// Route every message through the request pipeline
        #[arg(long)]
        smart: bool,
    },

    /// Send a single message and print the reply
    Ask {
        message: String,

        /// Use the plain tool loop instead of the planner
        #[arg(long)]
        standard: bool,

        /// Route through the request pipeline (code extraction, formatting)
        #[arg(long)]
        smart: bool,
    },

    /// List the built-in tools
    Tools,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let overrides = Overrides {
        config: cli.config,
        provider: cli.provider,
        model: cli.model,
    };

    match cli.command {
        Commands::Chat { standard, smart } => commands::chat::run(&overrides, standard, smart).await?,
        Commands::Ask {
            message,
            standard,
            smart,
        } => commands::ask::run(&overrides, &message, standard, smart).await?,
        Commands::Tools => commands::tools::run(&overrides)?,
        Commands::Init { force } => commands::init::run(&overrides, force)?,
    }

    Ok(())
}
