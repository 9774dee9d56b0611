use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    load_settings, ClientSettings, DetectionClient, HttpDetectionService, ImageAsset,
    SubmitOutcome, ThumbnailPreviewHost,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Submit an image to the detection service and print the verdict.
#[derive(Parser, Debug)]
struct Args {
    /// Image file to check.
    image: PathBuf,
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Also ask the service for text it decoded earlier.
    #[arg(long)]
    fetch_stored_text: bool,
}

fn apply_overrides(mut settings: ClientSettings, args: &Args) -> ClientSettings {
    if let Some(url) = &args.service_url {
        settings.service_url = url.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        settings.request_timeout_secs = timeout;
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let settings = apply_overrides(load_settings(), &args);
    let service = HttpDetectionService::new(&settings)?;
    println!("Detection service: {}", service.predict_url());
    let client = DetectionClient::new(
        Arc::new(service),
        Box::new(ThumbnailPreviewHost::new(settings.preview_max_dimension)),
    );

    let asset = ImageAsset::from_path(&args.image).await?;
    if !asset.looks_like_image() {
        warn!(file_name = asset.file_name(), "selected file does not look like an image");
    }
    client.select_image(asset).await;
    match client.preview_dimensions().await {
        Some((width, height)) => println!("Preview: {width}x{height}"),
        None => println!("Preview: unavailable"),
    }
    println!("{}", client.display_state().await);

    if let SubmitOutcome::Superseded(id) = client.submit().await {
        warn!(submission = %id, "submission was superseded");
    }

    if args.fetch_stored_text {
        if let Err(reason) = client.fetch_stored_text().await {
            eprintln!("Stored text unavailable: {reason}");
        }
    }

    let display = client.display_state().await;
    if display.is_error() {
        bail!("{display}");
    }
    println!("{display}");
    Ok(())
}
