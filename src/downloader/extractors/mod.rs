// External extractors - opaque `extract(target, output_path)` capabilities
//
// - yt-dlp: YouTube (and anything else yt-dlp understands)
// - instaloader: Instagram posts and reels by shortcode
//
// Failure output from either tool goes through `diagnostics` so the user
// gets a reason and a hint instead of a raw traceback.

mod cli;
pub mod diagnostics;
mod instaloader;
mod traits;

pub use cli::YtDlpExtractor;
pub use diagnostics::{diagnose_error, FailureReason};
pub use instaloader::InstaloaderExtractor;
pub use traits::{ExtractorConfig, MediaExtractor};

#[cfg(all(test, unix))]
pub(crate) use traits::fake_tool;
