// bases/download_cli/src/args.rs
use clap::Parser;
use std::path::PathBuf;

/// Download videos or MP3 audio through a running relay server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YouTube URL to download
    pub url: String,

    /// Base URL of the relay server
    #[arg(short, long, default_value = "http://localhost:4000")]
    pub server: String,

    /// Directory to store downloaded files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Download audio only, converted to MP3
    #[arg(short, long, conflicts_with = "quality")]
    pub audio: bool,

    /// Quality label to download, e.g. 720p
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Only list the available qualities
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
