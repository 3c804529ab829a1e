// Failure diagnostics - identifies why an external extractor gave up
//
// Analyzes stderr from yt-dlp / instaloader to determine the most likely
// cause and a short hint for the user.

/// Reasons an extractor invocation may fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Content needs an authenticated session
    LoginRequired,

    /// Private post, profile or video
    PrivateContent,

    /// Deleted or never existed
    ContentUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection / checkpoint / captcha
    BotDetection,

    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// The forced container/format is not offered for this item
    FormatUnavailable,

    /// Network timeout or unreachable host
    NetworkTimeout,

    /// Output we could not classify
    Unknown,
}

impl FailureReason {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::LoginRequired => "Login required",
            Self::PrivateContent => "Content is private",
            Self::ContentUnavailable => "Content unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by the platform",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::FormatUnavailable => "Requested format not available",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown failure",
        }
    }

    /// Short suggestion shown after the description
    pub fn hint(&self) -> &'static str {
        match self {
            Self::LoginRequired | Self::PrivateContent => {
                "Only public posts can be fetched without an account."
            }
            Self::ContentUnavailable => "Check that the URL still opens in a browser.",
            Self::GeoBlocked => "Try a proxy in an allowed region (set `proxy` in the config).",
            Self::RateLimited => "Wait 10-15 minutes before trying again.",
            Self::BotDetection => "Open the platform in a browser once, then retry later.",
            Self::Http403Forbidden => "Update the extractor tool; the platform may have changed.",
            Self::FormatUnavailable => "The item has no mp4 rendition.",
            Self::NetworkTimeout => "Check your internet connection or proxy.",
            Self::Unknown => "Re-run with -v for the full tool output.",
        }
    }
}

/// Analyze error output and return the most specific failure reason
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    // Check patterns in order of specificity

    if lower.contains("login required")
        || lower.contains("login_required")
        || lower.contains("use --login")
        || lower.contains("401 unauthorized")
        || lower.contains("sign in to confirm")
    {
        return Some(FailureReason::LoginRequired);
    }

    if lower.contains("private profile")
        || lower.contains("private video")
        || lower.contains("is private")
    {
        return Some(FailureReason::PrivateContent);
    }

    if lower.contains("video unavailable")
        || lower.contains("does not exist")
        || lower.contains("not found")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
    {
        return Some(FailureReason::ContentUnavailable);
    }

    if lower.contains("not available in your country") || lower.contains("geo restrict") {
        return Some(FailureReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("checkpoint")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
        || lower.contains("confirm you're not a bot")
    {
        return Some(FailureReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(FailureReason::Http403Forbidden);
    }

    if lower.contains("requested format is not available") {
        return Some(FailureReason::FormatUnavailable);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}
