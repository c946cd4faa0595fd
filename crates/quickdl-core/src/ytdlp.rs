//! Extractor backed by the yt-dlp binary

use crate::config::Config;
use crate::error::ExtractError;
use crate::extractor::{ExtractOptions, Extractor};
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ERROR:\s*(.+?)\s*$").expect("valid regex"));

#[derive(Debug)]
pub struct YtDlp {
    yt_dlp_path: PathBuf,
}

impl YtDlp {
    pub fn new(yt_dlp_path: PathBuf) -> Self {
        Self { yt_dlp_path }
    }

    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let path = config.yt_dlp_path().map_err(|_| ExtractError::YtDlpNotFound)?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.yt_dlp_path
    }

    /// Command line for one extraction
    pub fn build_args(options: &ExtractOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            options.format.clone().into(),
            "-o".into(),
            options.output_template.clone().into_os_string(),
        ];

        if options.no_playlist {
            args.push("--no-playlist".into());
        }
        if options.no_check_certificates {
            args.push("--no-check-certificates".into());
        }
        if options.geo_bypass {
            args.push("--geo-bypass".into());
        }
        if options.verbose {
            args.push("--verbose".into());
        }

        // Retention ages files by mtime, so keep the download time rather
        // than the server's Last-Modified stamp
        args.push("--no-mtime".into());

        // Report the final path on stdout once the file is in place
        args.extend(
            ["--no-simulate", "--no-progress", "--print", "after_move:filepath"]
                .into_iter()
                .map(OsString::from),
        );

        // The URL is user input; keep it from being read as an option
        args.push("--".into());
        args.push(options.url.clone().into());
        args
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn extract(&self, options: &ExtractOptions) -> Result<PathBuf, ExtractError> {
        info!("Downloading {} (format {})", options.url, options.format);

        let output = Command::new(&self.yt_dlp_path)
            .args(Self::build_args(options))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ExtractError::YtDlpNotFound
                } else {
                    ExtractError::Io(e)
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!("yt-dlp: {}", line);
        }

        if !output.status.success() {
            return Err(classify_failure(&options.url, output.status.code(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(printed) = extract_printed_path(&stdout) {
            let path = PathBuf::from(printed);
            if path.is_file() {
                debug!("yt-dlp reported: {}", path.display());
                return Ok(path);
            }
            warn!("yt-dlp reported a missing file: {}", path.display());
        }

        find_output_file(options.output_dir()).await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Turn a failed run's stderr into an error carrying yt-dlp's own message
pub fn classify_failure(url: &str, code: Option<i32>, stderr: &str) -> ExtractError {
    if stderr.contains("is not a valid URL") {
        return ExtractError::InvalidUrl(url.to_string());
    }
    if stderr.contains("Unsupported URL") {
        return ExtractError::UnsupportedUrl(url.to_string());
    }

    let message = ERROR_LINE
        .captures_iter(stderr)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .next_back()
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| match code {
            Some(code) => format!("yt-dlp failed with exit code {}", code),
            None => "yt-dlp was terminated by a signal".to_string(),
        });

    ExtractError::Failed { code, message }
}

fn extract_printed_path(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
}

/// Fallback when nothing usable was printed: the staging directory holds one result
async fn find_output_file(dir: &Path) -> Result<PathBuf, ExtractError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let partial = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("part") | Some("ytdl") | Some("temp")
        );
        if !partial && entry.file_type().await?.is_file() {
            debug!("Found output file: {}", path.display());
            return Ok(path);
        }
    }
    Err(ExtractError::MissingOutput)
}
