use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quickdl")]
#[command(author, version, about = "QuickDownloader: download video or audio from a URL through a web form")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    Serve(ServeOptions),

    /// Download a single URL into the download directory
    Get {
        /// Media URL
        url: String,

        /// Content type
        #[arg(short = 't', long = "type", value_enum, default_value = "video")]
        media_type: MediaTypeArg,

        /// Quality tier (ignored for audio)
        #[arg(short, long, value_enum, default_value = "best")]
        quality: QualityArg,

        /// Download directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete old downloads now
    Prune {
        /// Age threshold in hours (defaults to downloads.retention_hours)
        #[arg(long)]
        older_than_hours: Option<u64>,
    },

    /// Check external dependencies
    Doctor,

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone, Default)]
pub struct ServeOptions {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory downloads are stored in and served from
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaTypeArg {
    /// Best available audio+video stream
    Video,
    /// Best available audio-only stream
    Audio,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityArg {
    /// No resolution limit
    Best,
    /// Up to 1080p
    High,
    /// Up to 720p
    Medium,
    /// Up to 480p
    Low,
}
