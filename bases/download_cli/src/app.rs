// bases/download_cli/src/app.rs
use crate::args::Args;
use crate::output::OutputHandler;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use media_client::{Controller, RelayClient, SavedMedia};
use media_protocol::OutputKind;
use std::path::{Path, PathBuf};

pub struct App {
    args: Args,
    output: OutputHandler,
}

impl App {
    pub fn new(args: Args) -> Self {
        let output = OutputHandler::new(args.verbose);
        Self { args, output }
    }

    pub async fn run(&self) -> Result<()> {
        tracing::debug!("Using relay server at {}", self.args.server);
        let client = RelayClient::connect(&self.args.server)?;
        let mut controller = Controller::new();

        let spinner = self.output.start_fetch(&self.args.url);
        let fetched = controller.fetch_info(&client, &self.args.url).await;
        spinner.finish_and_clear();
        fetched?;

        if let Some(info) = controller.info() {
            self.output.print_info(info, &controller.quality_options());
        }
        if self.args.list {
            return Ok(());
        }

        if self.args.audio {
            controller.set_kind(OutputKind::AudioOnly);
        } else if let Some(quality) = &self.args.quality {
            controller.select_quality(quality)?;
        }
        self.output
            .print_download_start(controller.kind(), controller.selected_quality());

        let bar = self.output.progress_bar();
        let progress_bar = bar.clone();
        let downloaded = controller
            .download(&client, &self.args.url, move |progress| {
                OutputHandler::update_progress(&progress_bar, &progress)
            })
            .await;
        bar.finish_and_clear();
        let media = downloaded?;

        let path = self.save(&media).await?;
        self.output.print_download_complete(&path, media.bytes.len());

        Ok(())
    }

    async fn save(&self, media: &SavedMedia) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.args.output_dir)
            .await
            .wrap_err_with(|| format!("failed to create {}", self.args.output_dir.display()))?;

        let path = target_path(&self.args.output_dir, &media.filename);
        tokio::fs::write(&path, &media.bytes)
            .await
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }
}

/// Where a download lands; only the final path component of the announced name is used
fn target_path(output_dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    output_dir.join(name)
}
