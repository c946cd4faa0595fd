use anyhow::Result;
use std::path::Path;
use std::process::Command;
use which::which;

use quickdl_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("quickdl dependency check\n");

    let config = Config::load(config_path)?;
    let mut all_ok = true;

    // Check yt-dlp
    print!("yt-dlp:        ");
    match config.yt_dlp_path() {
        Ok(path) => match Command::new(&path).arg("--version").output() {
            Ok(out) if out.status.success() => {
                let v = String::from_utf8_lossy(&out.stdout);
                println!("OK ({}, {})", v.trim(), path.display());
            }
            _ => {
                println!("FOUND but failed to get version ({})", path.display());
                all_ok = false;
            }
        },
        Err(_) => {
            println!("NOT FOUND");
            println!("           Install with: pip install yt-dlp");
            all_ok = false;
        }
    }

    // yt-dlp needs FFmpeg to merge separate audio/video streams
    print!("ffmpeg:        ");
    match which("ffmpeg") {
        Ok(path) => match Command::new(&path).arg("-version").output() {
            Ok(out) => {
                let first_line = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                let version_part = first_line.split_whitespace().nth(2).unwrap_or("unknown");
                println!("OK ({})", version_part);
            }
            Err(_) => {
                println!("FOUND but failed to get version");
            }
        },
        Err(_) => {
            println!("NOT FOUND (optional, needed for merged formats)");
        }
    }

    // Download directory
    print!("downloads dir: ");
    let dir = &config.downloads.directory;
    match std::fs::create_dir_all(dir).and_then(|_| tempfile::tempfile_in(dir)) {
        Ok(_) => println!("OK ({}, writable)", dir.display()),
        Err(e) => {
            println!("NOT WRITABLE ({}: {})", dir.display(), e);
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}
