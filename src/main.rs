//! # Listing Watch CLI (`lwatch`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lwatch init` | Create the SQLite database and run schema migrations |
//! | `lwatch run` | Start the scheduler, the `/start` listener, and the health server |
//! | `lwatch check` | Run a single cycle now |
//! | `lwatch list` | Print stored listings |
//! | `lwatch subscribers` | Print registered chats |
//!
//! ## Examples
//!
//! ```bash
//! lwatch init --config ./config/lwatch.toml
//! lwatch check --dry-run --config ./config/lwatch.toml
//! LWATCH_BOT_TOKEN=123:abc lwatch run --config ./config/lwatch.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listing_watch::{app, config, list, migrate};

/// Listing Watch: alerts Telegram subscribers about new cars on a dealer's
/// used-car page.
#[derive(Parser)]
#[command(
    name = "lwatch",
    about = "Listing Watch: alerts Telegram subscribers about new cars on a dealer's listing page",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lwatch.toml")]
    config: PathBuf,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Watch the listing page until interrupted.
    ///
    /// Runs a cycle immediately, then every `schedule.poll_interval_ms`.
    /// Requires the bot token in the environment variable named by
    /// `telegram.token_env`.
    Run,

    /// Run one cycle in the foreground.
    Check {
        /// Fetch and diff only: no writes, no messages, no token needed.
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored listings.
    List,

    /// List registered subscriber chat ids.
    Subscribers,
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("listing_watch={level},listing_watch_core={level},lwatch={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Run => {
            app::run_watch(&cfg).await?;
        }
        Commands::Check { dry_run } => {
            app::run_check(&cfg, dry_run).await?;
        }
        Commands::List => {
            list::run_list(&cfg).await?;
        }
        Commands::Subscribers => {
            list::run_subscribers(&cfg).await?;
        }
    }

    Ok(())
}
