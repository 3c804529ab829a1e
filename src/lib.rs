pub mod cli;
pub mod config;
pub mod downloader;
pub mod logging;

use clap::Parser;
use std::sync::Arc;
use tracing::warn;

use cli::{Cli, Command, Request};
use config::AppConfig;
use downloader::models::{DownloadReport, Platform};
use downloader::tools::ToolManager;
use downloader::{ChromiumLauncher, DownloadError, Downloader};

/// Parse arguments, run one command and return the process exit code
pub async fn run() -> i32 {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    exit_code(execute(cli).await)
}

/// Print a failure once on stderr and map the outcome to an exit code
fn exit_code(outcome: Result<(), DownloadError>) -> i32 {
    match outcome {
        Ok(()) => 0,
        Err(e) if !e.is_fatal() => {
            eprintln!("{}", e);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn execute(cli: Cli) -> Result<(), DownloadError> {
    let config = AppConfig::load(cli.config.as_deref())?;

    if cli.command == Some(Command::Tools) {
        for info in ToolManager::new().get_all_tools().await {
            println!("{}", info.summary());
        }
        return Ok(());
    }

    // Prompt before installing the Ctrl-C handler so an interrupted menu still exits
    let request = match (&cli.command, cli.request(config.default_fps)) {
        (None, Some(request)) => Some(request),
        (None, None) => {
            let default_fps = config.default_fps;
            Some(
                tokio::task::spawn_blocking(move || cli::prompt_request(default_fps))
                    .await
                    .map_err(|e| DownloadError::Config(format!("Prompt failed: {}", e)))??,
            )
        }
        (Some(_), _) => None,
    };

    let downloader = Downloader::new(config, Arc::new(ChromiumLauncher), ToolManager::new())?;
    let cancel = downloader.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            cancel.cancel();
        }
    });

    match (cli.command, request) {
        (Some(Command::Clean), _) => {
            for dir in downloader.clean().await? {
                println!("Cleaned {}", dir.display());
            }
        }
        (Some(Command::Login), _) => {
            let session = downloader.login(Platform::Facebook).await?;
            println!(
                "Saved {} session ({} cookies) to {}",
                session.platform,
                session.cookies.len(),
                session.path.display()
            );
        }
        (_, Some(Request { url, mode, fps })) => {
            let report = downloader.run(&url, mode, fps).await?;
            print_report(&report);
        }
        (Some(Command::Tools), None) | (None, None) => {}
    }
    Ok(())
}

fn print_report(report: &DownloadReport) {
    for path in &report.saved {
        println!("Saved {}", path.display());
    }
    if report.failed > 0 {
        eprintln!("{} item(s) could not be downloaded", report.failed);
    }
    if let Some(frames) = &report.frames {
        let dir = frames
            .frames
            .first()
            .and_then(|p| p.parent())
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "Extracted {} frames at {} fps into {}",
            frames.len(),
            frames.fps,
            dir
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(Ok(())), 0);
        assert_eq!(exit_code(Err(DownloadError::NoThumbnailsFound("dQw4w9WgXcQ".into()))), 0);
        assert_eq!(exit_code(Err(DownloadError::NoVideoFound("https://v.redd.it/x".into()))), 1);
        assert_eq!(exit_code(Err(DownloadError::Cancelled)), 1);
    }
}
