//! replay-uploads - feed a folder of webcam stills to a running brt-cam
//!
//! Files are posted one at a time, in file-name order, tagged as replayed
//! uploads. A failed post is logged and the replay moves on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::multipart::{Form, Part};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "replay-uploads")]
#[command(about = "Replay webcam images against the brt-cam upload endpoint")]
#[command(version)]
struct Args {
    /// Folder with .jpg / .png images
    #[arg(short, long, default_value = "simulacao_webcam")]
    folder: PathBuf,

    /// Upload endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:10000/upload", env = "BRT_UPLOAD_URL")]
    url: String,

    /// Origin stop reported with every image
    #[arg(short, long, default_value = "simulacao")]
    origin_stop: String,

    /// Destination stop reported with every image
    #[arg(short, long)]
    destination_stop: Option<String>,

    /// Pause between uploads in milliseconds
    #[arg(short, long, default_value = "1000")]
    interval_ms: u64,
}

#[derive(Debug, Default)]
struct ReplaySummary {
    sent: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replay_uploads=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let images = list_images(&args.folder)
        .with_context(|| format!("Failed to read folder {}", args.folder.display()))?;
    if images.is_empty() {
        warn!("No .jpg or .png files in {}", args.folder.display());
        return Ok(());
    }
    info!("Replaying {} images to {}", images.len(), args.url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let mut summary = ReplaySummary::default();
    let pause = Duration::from_millis(args.interval_ms);

    for (i, path) in images.iter().enumerate() {
        match upload_one(&client, &args, path).await {
            Ok(body) => {
                summary.sent += 1;
                info!("Sent {}: {}", path.display(), body);
            }
            Err(e) => {
                summary.failed += 1;
                error!("Failed {}: {:#}", path.display(), e);
            }
        }

        if i + 1 < images.len() {
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        sent = summary.sent,
        failed = summary.failed,
        "Replay complete"
    );
    Ok(())
}

/// Images in `folder`, sorted by file name
fn list_images(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "png"))
        .unwrap_or(false)
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        _ => "image/jpeg",
    }
}

async fn upload_one(client: &reqwest::Client, args: &Args, path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.jpg".to_string());

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for(path))?;
    let mut form = Form::new()
        .part("image", part)
        .text("origin_stop", args.origin_stop.clone())
        .text("source", "replay");
    if let Some(destination) = &args.destination_stop {
        form = form.text("destination_stop", destination.clone());
    }

    let response = client.post(&args.url).multipart(form).send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("HTTP {}: {}", status, body);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "notes.txt", "c.JPG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.jpg")).unwrap();

        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.JPG"]);
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("x.png")), "image/png");
        assert_eq!(mime_for(Path::new("x.jpg")), "image/jpeg");
    }
}
