use anyhow::{bail, Result};
use std::path::Path;
use std::time::Duration;

use quickdl_core::config::{retention_from_hours, Config};
use quickdl_core::DownloadStore;

pub async fn run(older_than_hours: Option<u64>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let (hours, max_age) = max_age(older_than_hours, config.downloads.retention_hours)?;

    let store = DownloadStore::new(config.downloads.directory.clone());
    let removed = store.prune(max_age).await?;

    println!(
        "Removed {} entries older than {}h from {}",
        removed,
        hours,
        store.root().display()
    );
    Ok(())
}

/// The flag wins over the configured retention
fn max_age(older_than_hours: Option<u64>, configured: Option<u64>) -> Result<(u64, Duration)> {
    let Some(hours) = older_than_hours.or(configured) else {
        bail!("No age given. Pass --older-than-hours or set downloads.retention_hours");
    };
    let Some(age) = retention_from_hours(hours) else {
        bail!("Age of {} hours is too large", hours);
    };
    Ok((hours, age))
}
