use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hookgate_core::DecisionCache;
use hookgate_llm::HookgatePaths;
use tracing_subscriber::{EnvFilter, fmt};

mod hook;

#[derive(Parser)]
#[command(
    name = "hookgate",
    version,
    about = "hookgate: approval filter for agent tool calls"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Decide one tool request read from stdin (the default)
    Hook,
    /// Manage the decision cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached decision
    Clear,
    /// Print the cache file location
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they don't interfere with the decision envelope on stdout
    fmt()
        .with_env_filter(EnvFilter::from_env("HOOKGATE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hookgate: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = HookgatePaths::from_env();

    match cli.command.unwrap_or(Command::Hook) {
        Command::Hook => hook::run(&paths).await,
        Command::Cache { action } => {
            let cache = DecisionCache::new(paths.cache_file());
            match action {
                CacheAction::Clear => {
                    cache.clear().await?;
                    eprintln!("Cleared {}", cache.path().display());
                }
                CacheAction::Path => println!("{}", cache.path().display()),
            }
            Ok(())
        }
    }
}
