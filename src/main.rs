//! YouTube MP3 Downloader
//!
//! A desktop wrapper around yt-dlp and ffmpeg that saves YouTube videos,
//! shorts and playlists as 320 kbps MP3 files. All codec and network work is
//! delegated to the external tools; this application classifies URLs, drives
//! the subprocess, and renders its output.

use anyhow::{anyhow, Result};
use clap::Parser;
use iced::Application;
use mp3loader::downloader::{runner, tools, DownloadRequest};
use mp3loader::gui::Mp3LoaderApp;
use mp3loader::utils::config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mp3loader", about = "Download YouTube audio as 320 kbps MP3")]
struct Args {
    /// Run one download in the terminal without opening a window
    #[arg(long, value_name = "URL")]
    headless: Option<String>,

    /// Destination folder for --headless (defaults to the configured one)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Use Firefox cookies for --headless
    #[arg(long)]
    auth: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();

    // Missing tools are fatal for headless runs but only a warning for the
    // GUI, which shows the error when a download is attempted.
    let dependency_check = tools::check_dependencies();

    if let Some(url) = args.headless {
        if let Err(e) = dependency_check {
            return Err(anyhow!(e));
        }
        return run_headless(url, args.output, args.auth, &config);
    }

    if let Err(e) = dependency_check {
        eprintln!("WARNING: {}", e);
        eprintln!("The app will run, but downloads will fail until the tools are installed.");
    }

    let window_size = iced::Size::new(config.window_width as f32, config.window_height as f32);
    let window_position = match (config.window_x, config.window_y) {
        (Some(x), Some(y)) => iced::window::Position::Specific(iced::Point::new(x as f32, y as f32)),
        _ => iced::window::Position::Centered,
    };

    Mp3LoaderApp::run(iced::Settings {
        flags: config,
        window: iced::window::Settings {
            size: window_size,
            min_size: Some(iced::Size::new(480.0, 360.0)),
            position: window_position,
            ..Default::default()
        },
        ..Default::default()
    })?;

    Ok(())
}

fn run_headless(
    url: String,
    output: Option<PathBuf>,
    auth: bool,
    config: &AppConfig,
) -> Result<()> {
    let dest_dir = output.unwrap_or_else(|| PathBuf::from(&config.download_path));
    let request = DownloadRequest::from_url(&url, dest_dir, auth || config.use_youtube_auth)?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(runner::run_headless(request))?;
    println!("{:?}", outcome);
    Ok(())
}
