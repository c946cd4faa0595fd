//! HTTP surface: the form page, the download action and file delivery

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    extract::{rejection::PathRejection, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use quickdl_core::{DownloadOrchestrator, DownloadRequest, DownloadStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const INDEX_HTML: &str = include_str!("../assets/index.html");

const FILE_NOT_FOUND: &str = "File not found";

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<DownloadOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<DownloadOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// JSON answer of `POST /download`. Failures are reported in the body with status 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DownloadResponse {
    Saved {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    Failed {
        error: String,
    },
}

impl DownloadResponse {
    fn failed(error: impl ToString) -> Json<Self> {
        Json(Self::Failed {
            error: error.to_string(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/download", post(start_download))
        .route("/downloads/{filename}", get(download_file))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until interrupted
pub async fn run(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("QuickDownloader listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Periodically delete downloads older than `max_age`
pub fn spawn_retention(store: DownloadStore, max_age: Duration, every: Duration) {
    info!(
        "Pruning downloads older than {}h every {}s",
        max_age.as_secs() / 3600,
        every.as_secs()
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = store.prune(max_age).await {
                warn!("Retention pass failed: {}", e);
            }
        }
    });
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn start_download(State(state): State<AppState>, body: Bytes) -> Json<DownloadResponse> {
    let request: DownloadRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected request body: {}", e);
            return DownloadResponse::failed(format!("Invalid request: {}", e));
        }
    };

    match state.orchestrator.download(&request).await {
        Ok(outcome) => Json(DownloadResponse::Saved {
            file_path: outcome.public_path,
        }),
        Err(e) => {
            warn!("Download failed: {}", e);
            DownloadResponse::failed(e)
        }
    }
}

async fn download_file(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> Response {
    let Ok(Path(filename)) = filename else {
        return DownloadResponse::failed(FILE_NOT_FOUND).into_response();
    };

    match open_download(state.orchestrator.store(), &filename).await {
        Ok(response) => response,
        Err(e) => {
            debug!("Not serving {:?}: {}", filename, e);
            DownloadResponse::failed(FILE_NOT_FOUND).into_response()
        }
    }
}

async fn open_download(store: &DownloadStore, filename: &str) -> Result<Response> {
    let path = store.resolve(filename).await?;
    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type_for_filename(filename)));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&build_content_disposition(filename))?,
    );

    info!("Serving {} ({} bytes)", path.display(), length);
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

fn content_type_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "3gp" => "video/3gpp",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

fn build_content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitize_ascii_filename(filename),
        urlencoding::encode(filename)
    )
}

/// ASCII fallback for clients that ignore `filename*`
fn sanitize_ascii_filename(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        "download.bin".to_string()
    } else {
        trimmed.to_string()
    }
}
