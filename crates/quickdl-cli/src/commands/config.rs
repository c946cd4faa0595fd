use anyhow::Result;
use std::path::Path;
use quickdl_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("quickdl configuration\n");
    print!("{}", toml::to_string_pretty(&config)?);

    if config.extractor.yt_dlp.is_none() {
        match config.yt_dlp_path() {
            Ok(p) => println!("\n# yt-dlp auto-detected at {}", p.display()),
            Err(_) => println!("\n# yt-dlp not found in PATH"),
        }
    }
    if config.downloads.retention_hours.is_none() {
        println!("# retention disabled: downloads are kept until deleted");
    }

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    if let Some(p) = config_path {
        println!("  1. {} (specified)", p.display());
    }
    if let Some(config_dir) = dirs::config_dir() {
        println!("  2. {}/quickdl/config.toml", config_dir.display());
    }
    println!("  3. Environment variables (QUICKDL_*, nested with __, e.g. QUICKDL_SERVER__PORT)");

    Ok(())
}
