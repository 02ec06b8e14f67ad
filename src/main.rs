//! `medialink` CLI - resolve media URLs or run the gateway

mod cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "medialink")]
#[command(about = "Resolve SoundCloud and YouTube URLs into playable streams")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/medialink/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Listen address (overrides [server].bind)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Search SoundCloud tracks
    Search {
        /// Search terms
        query: String,

        /// Maximum number of tracks
        #[arg(short, long, default_value = "4")]
        limit: usize,
    },

    /// Show metadata for a SoundCloud track URL
    Resolve {
        /// Track URL
        url: String,
    },

    /// Print a playable stream URL for a SoundCloud track
    Stream {
        /// Track URL
        url: String,
    },

    /// YouTube formats and stream URLs
    #[command(subcommand)]
    Youtube(YoutubeCommands),
}

#[derive(Subcommand)]
enum YoutubeCommands {
    /// List every format of a video
    Info {
        /// Video URL
        url: String,
    },

    /// Best muxed format up to a quality (highest, 1080p, 720, ...)
    Video {
        /// Video URL
        url: String,

        #[arg(short, long, default_value = "highest")]
        quality: String,
    },

    /// Highest-bitrate audio-only format
    Audio {
        /// Video URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = medialink::Config::load(cli.config.as_deref())?;
    let ctx = cmd::Context::new(config, cli.json)?;

    match cli.command {
        Commands::Serve { bind } => {
            cmd::serve::cmd_serve(&ctx, bind).await?;
        }
        Commands::Search { query, limit } => {
            cmd::soundcloud::cmd_search(&ctx, &query, limit).await?;
        }
        Commands::Resolve { url } => {
            cmd::soundcloud::cmd_resolve(&ctx, &url).await?;
        }
        Commands::Stream { url } => {
            cmd::soundcloud::cmd_stream(&ctx, &url).await?;
        }
        Commands::Youtube(YoutubeCommands::Info { url }) => {
            cmd::youtube::cmd_info(&ctx, &url).await?;
        }
        Commands::Youtube(YoutubeCommands::Video { url, quality }) => {
            cmd::youtube::cmd_video(&ctx, &url, &quality).await?;
        }
        Commands::Youtube(YoutubeCommands::Audio { url }) => {
            cmd::youtube::cmd_audio(&ctx, &url).await?;
        }
    }

    Ok(())
}
