//! Turns a download request into one extractor run and a servable file

use crate::config::{Config, ExtractorConfig};
use crate::error::{ExtractError, QuickDlError, Result, StorageError};
use crate::extractor::{ExtractOptions, Extractor};
use crate::request::DownloadRequest;
use crate::storage::{CollisionPolicy, DownloadStore};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// URL prefix finished files are served under
pub const DOWNLOAD_ROUTE: &str = "/downloads";

/// A finished download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Location on disk
    pub path: PathBuf,
    pub file_name: String,
    /// Relative URL the browser fetches the file from
    pub public_path: String,
}

pub struct DownloadOrchestrator {
    extractor: Arc<dyn Extractor>,
    store: DownloadStore,
    collision: CollisionPolicy,
    extractor_config: ExtractorConfig,
}

impl DownloadOrchestrator {
    pub fn new(extractor: Arc<dyn Extractor>, config: &Config) -> Self {
        Self {
            extractor,
            store: DownloadStore::new(config.downloads.directory.clone()),
            collision: config.downloads.collision,
            extractor_config: config.extractor.clone(),
        }
    }

    pub fn store(&self) -> &DownloadStore {
        &self.store
    }

    /// Fetch the requested media and place it in the download directory.
    ///
    /// Resolves only after the whole file is on disk. Partial output is
    /// discarded when the extractor fails.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadOutcome> {
        let span = info_span!("download", id = %Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &DownloadRequest) -> Result<DownloadOutcome> {
        request.validate()?;
        let start = Instant::now();
        info!(
            "Request: {} ({}, {}) via {}",
            request.url.trim(),
            request.download_type,
            request.quality,
            self.extractor.name()
        );

        self.store.ensure().await?;
        let staging = self.store.staging()?;

        let options = ExtractOptions::for_request(request, staging.path(), &self.extractor_config);
        debug!("Extract options: {:?}", options);

        let reported = self.extractor.extract(&options).await.map_err(|e| {
            warn!("Extraction failed: {}", e);
            e
        })?;

        let staged = confine(&reported, staging.path()).await?;
        let path = self.store.place(&staged, self.collision).await?;
        // Dropping the handle clears anything else the extractor left behind
        drop(staging);

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToString::to_string)
            .ok_or_else(|| StorageError::InvalidName(path.display().to_string()))?;

        info!(
            "Saved {} ({:.1}s)",
            path.display(),
            start.elapsed().as_secs_f32()
        );

        Ok(DownloadOutcome {
            public_path: public_path(&file_name),
            file_name,
            path,
        })
    }
}

/// Public URL for a file in the download directory
pub fn public_path(file_name: &str) -> String {
    format!("{}/{}", DOWNLOAD_ROUTE, urlencoding::encode(file_name))
}

/// The extractor must have written inside its staging directory
async fn confine(reported: &Path, staging: &Path) -> Result<PathBuf> {
    let staging = tokio::fs::canonicalize(staging).await?;
    let file = tokio::fs::canonicalize(reported)
        .await
        .map_err(|_| QuickDlError::Extract(ExtractError::MissingOutput))?;

    if !file.starts_with(&staging) {
        return Err(StorageError::OutsideDirectory(reported.display().to_string()).into());
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MediaType, Quality};
    use crate::storage::STAGING_PREFIX;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Writes `<title>.<ext>` into the output directory and remembers what it was asked
    struct StubExtractor {
        title: String,
        ext: String,
        failure: Option<String>,
        calls: Mutex<Vec<ExtractOptions>>,
    }

    impl StubExtractor {
        fn new(title: &str, ext: &str) -> Self {
            Self {
                title: title.to_string(),
                ext: ext.to_string(),
                failure: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                failure: Some(message.to_string()),
                ..Self::new("unused", "mp4")
            }
        }

        fn last_call(&self) -> ExtractOptions {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        async fn extract(&self, options: &ExtractOptions) -> std::result::Result<PathBuf, ExtractError> {
            self.calls.lock().unwrap().push(options.clone());
            let dir = options.output_dir();
            if let Some(ref message) = self.failure {
                tokio::fs::write(dir.join("partial.mp4.part"), b"half").await?;
                return Err(ExtractError::Failed {
                    code: Some(1),
                    message: message.clone(),
                });
            }
            let path = dir.join(format!("{}.{}", self.title, self.ext));
            tokio::fs::write(&path, self.title.as_bytes()).await?;
            Ok(path)
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn orchestrator(dir: &Path, stub: Arc<StubExtractor>, collision: CollisionPolicy) -> DownloadOrchestrator {
        let mut config = Config::default();
        config.downloads.directory = dir.join("downloads");
        config.downloads.collision = collision;
        DownloadOrchestrator::new(stub, &config)
    }

    async fn visible_files(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_download_places_file_and_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("My Clip", "mp4"));
        let orch = orchestrator(tmp.path(), stub.clone(), CollisionPolicy::KeepBoth);

        let request = DownloadRequest::new("https://example.com/v/1", MediaType::Video, Quality::Best);
        let outcome = orch.download(&request).await.unwrap();

        assert_eq!(outcome.file_name, "My Clip.mp4");
        assert_eq!(outcome.public_path, "/downloads/My%20Clip.mp4");
        assert_eq!(outcome.path, orch.store().root().join("My Clip.mp4"));
        assert_eq!(visible_files(orch.store().root()).await, vec!["My Clip.mp4"]);
    }

    #[tokio::test]
    async fn test_video_medium_limits_height() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("clip", "mp4"));
        let orch = orchestrator(tmp.path(), stub.clone(), CollisionPolicy::KeepBoth);

        orch.download(&DownloadRequest::new("https://example.com/v", MediaType::Video, Quality::Medium))
            .await
            .unwrap();

        let options = stub.last_call();
        assert_eq!(options.format, "best[height<=720]");
        assert!(options.no_playlist);
        assert!(options.no_check_certificates);
        assert!(options.geo_bypass);
        assert!(options.verbose);
        assert!(options
            .output_template
            .to_string_lossy()
            .ends_with("%(title)s.%(ext)s"));
        let staging_name = options.output_dir().file_name().unwrap().to_string_lossy().into_owned();
        assert!(staging_name.starts_with(STAGING_PREFIX));
    }

    #[tokio::test]
    async fn test_audio_always_best_audio() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("song", "m4a"));
        let orch = orchestrator(tmp.path(), stub.clone(), CollisionPolicy::Overwrite);

        for quality in [Quality::Best, Quality::High, Quality::Medium, Quality::Low] {
            orch.download(&DownloadRequest::new("https://example.com/a", MediaType::Audio, quality))
                .await
                .unwrap();
            let format = stub.last_call().format;
            assert!(format.starts_with("bestaudio"), "{quality}: {format}");
            assert!(!format.contains("height"));
        }
    }

    #[tokio::test]
    async fn test_blank_url_never_reaches_extractor() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("clip", "mp4"));
        let orch = orchestrator(tmp.path(), stub.clone(), CollisionPolicy::KeepBoth);

        let err = orch
            .download(&DownloadRequest::new("   ", MediaType::Video, Quality::Best))
            .await
            .unwrap_err();
        assert!(matches!(err, QuickDlError::InvalidRequest(_)));
        assert!(stub.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_message_and_cleans_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::failing("Unsupported URL: https://example.com/x"));
        let orch = orchestrator(tmp.path(), stub, CollisionPolicy::KeepBoth);

        let err = orch
            .download(&DownloadRequest::new("https://example.com/x", MediaType::Video, Quality::Best))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported URL: https://example.com/x");
        assert!(visible_files(orch.store().root()).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_request_keeps_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("clip", "webm"));
        let orch = orchestrator(tmp.path(), stub, CollisionPolicy::KeepBoth);
        let request = DownloadRequest::new("https://example.com/v", MediaType::Video, Quality::Best);

        let first = orch.download(&request).await.unwrap();
        let second = orch.download(&request).await.unwrap();

        assert_eq!(first.public_path, "/downloads/clip.webm");
        assert_eq!(second.public_path, "/downloads/clip%20%281%29.webm");
        assert_eq!(visible_files(orch.store().root()).await, vec!["clip (1).webm", "clip.webm"]);
    }

    #[tokio::test]
    async fn test_repeated_request_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubExtractor::new("clip", "webm"));
        let orch = orchestrator(tmp.path(), stub, CollisionPolicy::Overwrite);
        let request = DownloadRequest::new("https://example.com/v", MediaType::Video, Quality::Best);

        let first = orch.download(&request).await.unwrap();
        let second = orch.download(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(visible_files(orch.store().root()).await, vec!["clip.webm"]);
    }

    #[tokio::test]
    async fn test_output_outside_staging_rejected() {
        struct Escaping(PathBuf);

        #[async_trait]
        impl Extractor for Escaping {
            async fn extract(&self, _: &ExtractOptions) -> std::result::Result<PathBuf, ExtractError> {
                tokio::fs::write(&self.0, b"x").await?;
                Ok(self.0.clone())
            }

            fn name(&self) -> &'static str {
                "escaping"
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.downloads.directory = tmp.path().join("downloads");
        let orch = DownloadOrchestrator::new(Arc::new(Escaping(tmp.path().join("elsewhere.mp4"))), &config);

        let err = orch
            .download(&DownloadRequest::new("https://example.com", MediaType::Video, Quality::Best))
            .await
            .unwrap_err();
        assert!(matches!(err, QuickDlError::Storage(StorageError::OutsideDirectory(_))));
    }

    #[test]
    fn test_public_path_encoding() {
        assert_eq!(public_path("a.mp4"), "/downloads/a.mp4");
        assert_eq!(public_path("a#b?.mp4"), "/downloads/a%23b%3F.mp4");
    }
}
