//! Boundary to the external extraction tool

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::request::DownloadRequest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Output file name template, relative to the target directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Everything the extractor needs to fetch one media item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub url: String,
    /// yt-dlp format selector (`-f`)
    pub format: String,
    /// Full output template, e.g. `downloads/.partial-x/%(title)s.%(ext)s`
    pub output_template: PathBuf,
    /// Download only the referenced item, never the playlist around it
    pub no_playlist: bool,
    pub no_check_certificates: bool,
    pub geo_bypass: bool,
    pub verbose: bool,
}

impl ExtractOptions {
    pub fn for_request(request: &DownloadRequest, output_dir: &Path, config: &ExtractorConfig) -> Self {
        Self {
            url: request.url.trim().to_string(),
            format: request.format_selector(),
            output_template: output_dir.join(OUTPUT_TEMPLATE),
            no_playlist: true,
            no_check_certificates: config.no_check_certificates,
            geo_bypass: config.geo_bypass,
            verbose: config.verbose,
        }
    }

    /// Directory the template writes into
    pub fn output_dir(&self) -> &Path {
        self.output_template.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Resolves a media URL, selects a stream and fetches it to disk.
///
/// Implementations return the path of the file they wrote, which must live
/// inside [`ExtractOptions::output_dir`].
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, options: &ExtractOptions) -> Result<PathBuf, ExtractError>;

    fn name(&self) -> &'static str;
}
