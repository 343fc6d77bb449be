mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mapstory::config::MapstoryConfig;

#[derive(Parser)]
#[command(name = "mapstory", version, about = "Slippy map for diary memories")]
struct Cli {
    /// Config file (defaults to ~/.mapstory/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a frame for a memories file and print it as JSON
    Render {
        /// JSON array of memory records
        #[arg(long)]
        memories: PathBuf,
        #[command(flatten)]
        view: cli::ViewArgs,
        /// Run external lookups for unknown places before rendering
        #[arg(long)]
        resolve: bool,
    },
    /// Resolve a place name to coordinates
    Geocode {
        name: String,
    },
    /// List the tile URLs covering a view
    Tiles {
        #[command(flatten)]
        view: cli::ViewArgs,
    },
    /// Address suggestions for a partial input
    Suggest {
        query: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MapstoryConfig::load_from(path)?,
        None => MapstoryConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render {
            memories,
            view,
            resolve,
        } => cli::render::render(config, &memories, &view, resolve).await?,
        Command::Geocode { name } => cli::geocode::geocode(&config, &name).await?,
        Command::Tiles { view } => cli::tiles::tiles(&config, &view)?,
        Command::Suggest { query } => cli::suggest::suggest(&config, &query).await?,
    }

    Ok(())
}
