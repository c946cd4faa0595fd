use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::args::{MediaTypeArg, QualityArg};
use quickdl_core::{
    config::Config, DownloadOrchestrator, DownloadRequest, MediaType, Quality, YtDlp,
};

pub async fn run(
    url: &str,
    media_type: MediaTypeArg,
    quality: QualityArg,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(dir) = output {
        config.downloads.directory = dir;
    }

    let request = DownloadRequest::new(url, to_media_type(media_type), to_quality(quality));
    let orchestrator = DownloadOrchestrator::new(Arc::new(YtDlp::from_config(&config)?), &config);

    // yt-dlp reports no progress here, so a spinner is all we can honestly show
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Downloading {} ({}, {})", url, request.download_type, request.quality));
    pb.enable_steady_tick(Duration::from_millis(100));

    match orchestrator.download(&request).await {
        Ok(outcome) => {
            pb.finish_with_message(format!("Done: {}", outcome.file_name));
            println!("\nOutput: {}", outcome.path.display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Failed");
            eprintln!("\nError: {}", e);
            Err(e.into())
        }
    }
}

fn to_media_type(arg: MediaTypeArg) -> MediaType {
    match arg {
        MediaTypeArg::Video => MediaType::Video,
        MediaTypeArg::Audio => MediaType::Audio,
    }
}

fn to_quality(arg: QualityArg) -> Quality {
    match arg {
        QualityArg::Best => Quality::Best,
        QualityArg::High => Quality::High,
        QualityArg::Medium => Quality::Medium,
        QualityArg::Low => Quality::Low,
    }
}
