// Downloader module - platform-dispatch download pipeline

pub mod browser;
pub mod classifier;
pub mod errors;
pub mod extractors;
pub mod frames;
pub mod login;
pub mod materializer;
pub mod models;
pub mod orchestrator;
pub mod scrape;
pub mod session;
pub mod strategies;
pub mod tools;
pub mod traits;
pub mod utils;

pub use browser::{BrowserLauncher, BrowserPage, ChromiumLauncher, LaunchOptions};
pub use classifier::classify;
pub use errors::DownloadError;
pub use materializer::{MaterializedBatch, Materializer};
pub use models::{
    ContentKind, DownloadReport, FrameSet, MediaMode, MediaPayload, Platform, RetrievedMedia,
    SourceDescriptor,
};
pub use orchestrator::Downloader;
pub use session::{Session, SessionCookie, SessionStore};
pub use traits::RetrievalStrategy;
