//! Assemble CLI, the main entry point.
//!
//! Commands:
//! - `ask`     Run a single goal through the ReAct agent
//! - `chat`    Line-oriented conversation over one agent
//! - `config`  Print the default config or its path

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "assemble",
    about = "Assemble: state-machine LLM agents",
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
    /// Run one goal and print the answer
    Ask {
        /// The goal or question
        goal: String,

        /// Start the run in this state instead of the agent's default
        #[arg(long)]
        initial_state: Option<String>,

        /// Override the configured step limit
        #[arg(long)]
        step_limit: Option<usize>,

        /// Print every step before the answer
        #[arg(long)]
        steps: bool,

        /// Print the full response as JSON
        #[arg(long, conflicts_with = "steps")]
        json: bool,
    },

    /// Chat with the agent; memory carries across turns
    Chat {
        /// Rewrite follow-ups into standalone questions first
        #[arg(long)]
        rewrite_question: bool,

        /// Summarize the conversation before each turn
        #[arg(long)]
        summarize: bool,
    },

    /// Show configuration
    Config {
        /// Print the config file path instead of the default TOML
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask {
            goal,
            initial_state,
            step_limit,
            steps,
            json,
        } => {
            let output = if json {
                commands::ask::Output::Json
            } else if steps {
                commands::ask::Output::Steps
            } else {
                commands::ask::Output::Answer
            };
            commands::ask::run(goal, initial_state, step_limit, output).await?
        }
        Commands::Chat {
            rewrite_question,
            summarize,
        } => commands::chat::run(rewrite_question, summarize).await?,
        Commands::Config { path } => commands::config_cmd::run(path)?,
    }

    Ok(())
}
