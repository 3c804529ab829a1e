// Command-line arguments and the interactive menu

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::MediaMode;

/// Download reels, posts and thumbnails, and sample video into frames
#[derive(Parser, Debug)]
#[command(name = "social-downloader", version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Post, reel or video URL (omit for the interactive menu)
    pub url: Option<String>,

    /// Frames per second sampled from a downloaded video
    #[arg(value_parser = parse_fps)]
    pub fps: Option<f64>,

    /// Download the post's images (YouTube: thumbnails) instead of its video
    #[arg(long)]
    pub images: bool,

    /// Configuration file path (layered over the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Log in to Facebook in a visible browser and store the session
    Login,
    /// Wipe and recreate the frames and images directories
    Clean,
    /// Show which external tools are installed
    Tools,
}

/// One download job
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub mode: MediaMode,
    pub fps: f64,
}

impl Cli {
    /// Job from the positional arguments, or `None` when the menu should ask
    pub fn request(&self, default_fps: f64) -> Option<Request> {
        self.url.as_ref().map(|url| Request {
            url: url.clone(),
            mode: if self.images {
                MediaMode::Images
            } else {
                MediaMode::Video
            },
            fps: self.fps.unwrap_or(default_fps),
        })
    }
}

pub fn parse_fps(raw: &str) -> Result<f64, String> {
    let fps: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", raw))?;
    if !(fps.is_finite() && fps > 0.0) {
        return Err("fps must be a positive number".to_string());
    }
    Ok(fps)
}

pub fn validate_url(raw: &str) -> Result<(), String> {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(())
    } else {
        Err("URL must start with http:// or https://".to_string())
    }
}

fn input_error(e: dialoguer::Error) -> DownloadError {
    DownloadError::Config(format!("Failed to get user input: {}", e))
}

/// Ask for mode, URL and fps on the terminal. Blocking.
pub fn prompt_request(default_fps: f64) -> Result<Request, DownloadError> {
    use dialoguer::{Input, Select};

    let selection = Select::new()
        .with_prompt("What do you want to download?")
        .items(&["Video (and extract frames)", "Images"])
        .default(0)
        .interact()
        .map_err(input_error)?;

    let mode = match selection {
        0 => MediaMode::Video,
        _ => MediaMode::Images,
    };

    let url: String = Input::new()
        .with_prompt("URL")
        .validate_with(|input: &String| validate_url(input))
        .interact_text()
        .map_err(input_error)?;

    let fps = match mode {
        MediaMode::Video => {
            let raw: String = Input::new()
                .with_prompt("Frames per second")
                .default(default_fps.to_string())
                .validate_with(|input: &String| parse_fps(input).map(|_| ()))
                .interact_text()
                .map_err(input_error)?;
            parse_fps(&raw).map_err(DownloadError::Config)?
        }
        MediaMode::Images => default_fps,
    };

    Ok(Request {
        url: url.trim().to_string(),
        mode,
        fps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn positional_url_and_fps() {
        let cli = Cli::try_parse_from(["social-downloader", "https://youtu.be/dQw4w9WgXcQ", "2.5"]).unwrap();
        assert_eq!(
            cli.request(10.0),
            Some(Request {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                mode: MediaMode::Video,
                fps: 2.5,
            })
        );
    }

    #[test]
    fn fps_defaults_without_prompt() {
        let cli = Cli::try_parse_from(["social-downloader", "--images", "https://i.redd.it/a.jpg"]).unwrap();
        let request = cli.request(10.0).unwrap();
        assert_eq!(request.mode, MediaMode::Images);
        assert_eq!(request.fps, 10.0);
    }

    #[test]
    fn no_url_means_menu() {
        let cli = Cli::try_parse_from(["social-downloader", "-vv"]).unwrap();
        assert_eq!(cli.request(10.0), None);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn subcommands_and_global_flags() {
        let cli = Cli::try_parse_from(["social-downloader", "clean", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.command, Some(Command::Clean));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));

        let cli = Cli::try_parse_from(["social-downloader", "login"]).unwrap();
        assert_eq!(cli.command, Some(Command::Login));
    }

    #[test]
    fn rejects_non_positive_fps() {
        assert!(Cli::try_parse_from(["social-downloader", "https://youtu.be/x", "0"]).is_err());
        assert!(Cli::try_parse_from(["social-downloader", "https://youtu.be/x", "-3"]).is_err());
        assert!(parse_fps("abc").is_err());
        assert_eq!(parse_fps(" 12 "), Ok(12.0));
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://www.instagram.com/reel/x/").is_ok());
        assert!(validate_url("www.instagram.com/reel/x/").is_err());
    }
}
