//! Download request model and format selection

use crate::error::QuickDlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user wants out of the media URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

/// Quality tier; only video honours it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Best,
    High,
    Medium,
    Low,
}

impl Quality {
    /// Maximum vertical resolution for video, `None` for unconstrained
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::High => Some(1080),
            Quality::Medium => Some(720),
            Quality::Low => Some(480),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => write!(f, "video"),
            MediaType::Audio => write!(f, "audio"),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Best => write!(f, "best"),
            Quality::High => write!(f, "high"),
            Quality::Medium => write!(f, "medium"),
            Quality::Low => write!(f, "low"),
        }
    }
}

/// Body of `POST /download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub download_type: MediaType,
    #[serde(default)]
    pub quality: Quality,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, download_type: MediaType, quality: Quality) -> Self {
        Self {
            url: url.into(),
            download_type,
            quality,
        }
    }

    /// Reject requests without a usable URL. Everything else is left to yt-dlp.
    pub fn validate(&self) -> Result<(), QuickDlError> {
        if self.url.trim().is_empty() {
            return Err(QuickDlError::InvalidRequest(
                "Please enter a valid URL".to_string(),
            ));
        }
        Ok(())
    }

    /// yt-dlp `-f` expression for this request
    pub fn format_selector(&self) -> String {
        match self.download_type {
            MediaType::Video => match self.quality.max_height() {
                Some(height) => format!("best[height<={}]", height),
                None => "best".to_string(),
            },
            MediaType::Audio => match self.quality {
                Quality::Best => "bestaudio".to_string(),
                _ => "bestaudio/best".to_string(),
            },
        }
    }
}
