// bases/download_cli/src/output.rs
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use media_client::Progress;
use media_protocol::{OutputKind, VideoInfoResponse};
use std::path::Path;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.blue} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";
const BYTES_TEMPLATE: &str = "{spinner:.blue} {bytes} received";

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn start_fetch(&self, url: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Fetching video info for {}", url));
        pb
    }

    pub fn print_info(&self, info: &VideoInfoResponse, qualities: &[String]) {
        println!("Title: {}", info.title);
        if qualities.is_empty() {
            println!("Qualities: none with both video and audio (audio download only)");
        } else {
            println!("Qualities: {}", qualities.join(", "));
        }

        if self.verbose {
            for format in &info.formats {
                println!(
                    "  itag {:>4}  {:<10} video={:<5} audio={:<5} {}",
                    format.itag, format.quality, format.has_video, format.has_audio, format.mime_type
                );
            }
        }
    }

    pub fn print_download_start(&self, kind: OutputKind, quality: Option<&str>) {
        match (kind, quality) {
            (OutputKind::AudioOnly, _) => println!("Downloading audio as MP3"),
            (OutputKind::Muxed, Some(quality)) => println!("Downloading video at {}", quality),
            (OutputKind::Muxed, None) => println!("Downloading video"),
        }
    }

    /// Bar whose length is set once the server declares a size
    pub fn progress_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template(BYTES_TEMPLATE) {
            pb.set_style(style);
        }
        pb
    }

    pub fn update_progress(pb: &ProgressBar, progress: &Progress) {
        if let Some(total) = progress.total {
            if pb.length() != Some(total) {
                pb.set_length(total);
                if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                    pb.set_style(style.progress_chars("=> "));
                }
            }
            pb.set_message(progress.to_string());
        }
        pb.set_position(progress.received);
    }

    pub fn print_download_complete(&self, path: &Path, size: usize) {
        println!("Saved {} ({})", path.display(), HumanBytes(size as u64));
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}
