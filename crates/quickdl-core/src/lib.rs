//! quickdl-core: request mapping, yt-dlp invocation and download storage for QuickDownloader

pub mod config;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod request;
pub mod storage;
pub mod ytdlp;

pub use config::Config;
pub use error::{QuickDlError, Result};
pub use extractor::{ExtractOptions, Extractor};
pub use orchestrator::{DownloadOrchestrator, DownloadOutcome};
pub use request::{DownloadRequest, MediaType, Quality};
pub use storage::{CollisionPolicy, DownloadStore};
pub use ytdlp::YtDlp;
