use anyhow::Result;
use cadenza_core::ArtistLinkType;
use cadenza_recommend::Config;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Debug, Parser)]
#[command(name = "cadenza", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/cadenza/cadenza.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory of the cached model (default: ~/.cache/cadenza)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Train the similarity model from the catalog's audio features
    ///
    /// Every track with analysis data contributes one sample built from the
    /// configured features. Tracks lacking a feature, or whose stored
    /// values do not have the expected number of dimensions, are skipped.
    ///
    /// Unless --force is given, a valid cached model is reused and no
    /// training happens. A freshly trained model replaces the cache.
    ///
    /// Press Ctrl-C to stop training; the previous cached model is kept.
    Train {
        /// Discard the cached model and train from scratch
        #[arg(long)]
        force: bool,
    },
    /// Find catalog entries similar to a track, release or artist
    ///
    /// Uses the cached model, training one first if none exists. Entries
    /// removed from the catalog since training are never reported.
    Similar {
        #[command(subcommand)]
        query: SimilarQuery,
    },
    /// Show a summary of the cached model
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum SimilarQuery {
    /// Tracks similar to one or more tracks
    Tracks {
        /// Track IDs
        #[arg(required = true)]
        ids: Vec<u64>,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Tracks similar to the content of a track list
    TrackList {
        /// Track list ID
        id: u64,

        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Releases similar to a release
    Release {
        /// Release ID
        id: u64,

        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Artists similar to an artist
    Artist {
        /// Artist ID
        id: u64,

        /// Roles to compare through, comma separated (default: all)
        #[arg(long = "link-type", value_delimiter = ',')]
        link_types: Vec<ArtistLinkType>,

        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show current effective configuration
    Show,
    /// Show config file contents, or a single value
    Get {
        /// Config key (database_path, cache_dir, logging.level)
        key: Option<String>,
    },
    /// Show config file path
    Path,
    /// Print an example configuration
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_paths(cli.db, cli.cache_dir)?;
    logging::setup(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Train { force } => {
            commands::run_train(config, force).await?;
        }
        Commands::Similar { query } => {
            commands::run_similar(config, query).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Get { key } => commands::config::get_config(&config, key)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
