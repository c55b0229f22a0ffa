// bases/relay_server/src/config.rs
use clap::Parser;
use std::path::PathBuf;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Extractor executable
    pub yt_dlp: PathBuf,

    /// Transcoder executable
    pub ffmpeg: PathBuf,

    /// Bitrate of audio-only downloads in kbit/s
    pub audio_bitrate: u32,

    /// Directory served under /static
    pub static_dir: PathBuf,
}

/// Video download relay - lists renditions and streams them to the browser
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Path or name of the yt-dlp executable
    #[arg(long = "yt-dlp", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Path or name of the ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// MP3 bitrate (kbit/s) for audio-only downloads
    #[arg(long, default_value_t = 192, value_parser = clap::value_parser!(u32).range(32..=320))]
    pub audio_bitrate: u32,

    /// Directory with the page's script and stylesheet
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            yt_dlp: args.yt_dlp,
            ffmpeg: args.ffmpeg,
            audio_bitrate: args.audio_bitrate,
            static_dir: args.static_dir,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
