use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::args::ServeOptions;
use crate::server::{self, AppState};
use quickdl_core::{config::Config, DownloadOrchestrator, YtDlp};

pub async fn run(options: &ServeOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    apply_overrides(&mut config, options);

    let ytdlp = YtDlp::from_config(&config)?;
    info!("Using yt-dlp at {}", ytdlp.path().display());

    let orchestrator = Arc::new(DownloadOrchestrator::new(Arc::new(ytdlp), &config));
    orchestrator
        .store()
        .ensure()
        .await
        .with_context(|| format!("Failed to create {}", config.downloads.directory.display()))?;
    info!("Download directory: {}", config.downloads.directory.display());

    if let Some(max_age) = config.retention() {
        server::spawn_retention(
            orchestrator.store().clone(),
            max_age,
            Duration::from_secs(config.downloads.prune_interval_secs),
        );
    }

    server::run(&config.bind_addr(), AppState::new(orchestrator)).await
}

fn apply_overrides(config: &mut Config, options: &ServeOptions) {
    if let Some(ref host) = options.host {
        config.server.host = host.clone();
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if let Some(ref dir) = options.download_dir {
        config.downloads.directory = dir.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &ServeOptions {
                host: Some("0.0.0.0".to_string()),
                port: None,
                download_dir: Some(PathBuf::from("/data")),
            },
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.downloads.directory, PathBuf::from("/data"));
    }
}
