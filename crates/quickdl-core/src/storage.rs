//! The download directory: staging, placement, lookup and retention

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Prefix of per-request staging directories
pub const STAGING_PREFIX: &str = ".partial-";

/// Highest numeric suffix tried before giving up on a free name
const MAX_SUFFIX: u32 = 10_000;

/// How to place a finished file whose name is already taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the existing file and store the new one as `Title (1).ext`
    #[default]
    KeepBoth,
    /// Replace the existing file
    Overwrite,
}

#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
}

impl DownloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Private scratch directory for one download; removed with everything in it on drop
    pub fn staging(&self) -> Result<TempDir, StorageError> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)?;
        debug!("Staging directory: {}", dir.path().display());
        Ok(dir)
    }

    /// Move a finished file into the directory, returning its final path.
    ///
    /// The placed file's mtime is reset to now so retention counts from
    /// the moment it became servable.
    pub async fn place(&self, src: &Path, policy: CollisionPolicy) -> Result<PathBuf, StorageError> {
        let name = src
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidName(src.display().to_string()))?;

        let target = match policy {
            CollisionPolicy::Overwrite => {
                let target = self.root.join(name);
                tokio::fs::rename(src, &target).await?;
                target
            }
            CollisionPolicy::KeepBoth => self.claim_free_name(src, name).await?,
        };

        if let Err(e) = touch(&target).await {
            warn!("Could not reset mtime of {}: {}", target.display(), e);
        }
        Ok(target)
    }

    async fn claim_free_name(&self, src: &Path, name: &str) -> Result<PathBuf, StorageError> {
        let (stem, ext) = split_name(name);
        let mut linking = true;
        let mut n = 0;
        while n <= MAX_SUFFIX {
            let candidate = self.root.join(numbered_name(stem, ext, n));
            // Both hard_link and create_new refuse to replace, so claiming a name is atomic
            let claimed = if linking {
                tokio::fs::hard_link(src, &candidate).await
            } else {
                copy_new(src, &candidate).await
            };
            match claimed {
                Ok(()) => {
                    tokio::fs::remove_file(src).await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) if linking && links_unsupported(&e) => {
                    debug!("Hard links unavailable in {} ({}), copying", self.root.display(), e);
                    linking = false;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::InvalidName(format!(
            "no free name left for {}",
            name
        )))
    }

    /// Map an untrusted file name to a file inside the directory
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))?;
        let path = tokio::fs::canonicalize(root.join(name))
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))?;

        // Symlinks could still point elsewhere
        if !path.starts_with(&root) {
            warn!("Blocked path outside download directory: {}", path.display());
            return Err(StorageError::OutsideDirectory(name.to_string()));
        }

        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Delete downloads and abandoned staging directories older than `max_age`
    pub async fn prune(&self, max_age: Duration) -> Result<usize, StorageError> {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!("Could not stat {}: {}", path.display(), e);
                    continue;
                }
            };
            let modified: DateTime<Utc> = match metadata.modified() {
                Ok(t) => t.into(),
                Err(e) => {
                    warn!("No modification time for {}: {}", path.display(), e);
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            let result = if metadata.is_dir() && is_staging {
                tokio::fs::remove_dir_all(&path).await
            } else if metadata.is_file() {
                tokio::fs::remove_file(&path).await
            } else {
                continue;
            };

            match result {
                Ok(()) => {
                    debug!("Pruned {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            info!("Pruned {} entries older than {}", removed, cutoff.to_rfc3339());
        }
        Ok(removed)
    }
}

/// exFAT, some FUSE and SMB mounts have no hard links
fn links_unsupported(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::Unsupported | ErrorKind::PermissionDenied)
}

/// Copy `src` to a name that must not exist yet
async fn copy_new(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut out = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .await?;
    let copied = async {
        let mut input = tokio::fs::File::open(src).await?;
        tokio::io::copy(&mut input, &mut out).await?;
        out.flush().await
    }
    .await;
    drop(out);
    if copied.is_err() {
        let _ = tokio::fs::remove_file(dst).await;
    }
    copied
}

async fn touch(path: &Path) -> std::io::Result<()> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    let file = file.into_std().await;
    tokio::task::spawn_blocking(move || file.set_modified(SystemTime::now())).await?
}

/// Only plain, visible file names are servable
fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn numbered_name(stem: &str, ext: Option<&str>, n: u32) -> String {
    match (n, ext) {
        (0, Some(ext)) => format!("{}.{}", stem, ext),
        (0, None) => stem.to_string(),
        (n, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
        (n, None) => format!("{} ({})", stem, n),
    }
}
