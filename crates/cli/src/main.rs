mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rpipe",
    version,
    about = "Group messages per receiver and move them through pipeline states"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, short, default_value = "rpipe.toml", global = true)]
    config: PathBuf,

    /// Redis URL, overrides the [redis] table of the configuration
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the state chain, collector first
    States,
    /// Print the bucket key for an identifier and state
    Key { id: String, state: String },
    /// Split a bucket key into identifier and state
    Parse { key: String },
    /// Register messages from a JSON file (one message or an array)
    Register { file: PathBuf },
    /// Add a single value to a bucket
    Add {
        id: String,
        state: String,
        value: String,
    },
    /// List the members of a bucket
    Members { id: String, state: String },
    /// List the members of the collector bucket
    Collected { id: String },
    /// Move a bucket from one state to another
    Move { id: String, from: String, to: String },
    /// Move a bucket to the state following `from`
    Next { id: String, from: String },
    /// Union source buckets into a destination bucket, keeping the sources
    Merge {
        id: String,
        to: String,
        #[arg(required = true)]
        from: Vec<String>,
    },
    /// Delete a bucket
    Clear { id: String, state: String },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let target = commands::Target {
        config_path: cli.config,
        redis_url: cli.redis_url,
    };

    let result = match cli.command {
        Commands::States => commands::inspect::states(&target).await,
        Commands::Key { id, state } => commands::inspect::key(&target, &id, &state).await,
        Commands::Parse { key } => commands::inspect::parse(&target, &key).await,
        Commands::Register { file } => commands::buckets::register(&target, &file).await,
        Commands::Add { id, state, value } => {
            commands::buckets::add(&target, &id, &state, &value).await
        }
        Commands::Members { id, state } => commands::buckets::members(&target, &id, &state).await,
        Commands::Collected { id } => commands::buckets::collected(&target, &id).await,
        Commands::Move { id, from, to } => {
            commands::buckets::move_bucket(&target, &id, &from, &to).await
        }
        Commands::Next { id, from } => commands::buckets::next(&target, &id, &from).await,
        Commands::Merge { id, to, from } => {
            commands::buckets::merge(&target, &id, &to, &from).await
        }
        Commands::Clear { id, state } => commands::buckets::clear(&target, &id, &state).await,
    };

    result.map_err(|e| color_eyre::eyre::eyre!(e))
}
