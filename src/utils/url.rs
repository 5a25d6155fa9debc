//! Video URL validation

use crate::error::TubeError;
use regex::Regex;
use std::sync::LazyLock;

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?((www\.)?youtube\.com|youtu\.be)/.+$").expect("valid URL pattern")
});

/// Check the URL shape without touching the network
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

/// Validate a user-supplied URL.
///
/// Accepts `youtube.com`, `www.youtube.com` and `youtu.be` with any non-empty
/// path, scheme optional.
pub fn validate_url(url: &str) -> Result<(), TubeError> {
    if is_video_url(url) {
        Ok(())
    } else {
        Err(TubeError::InvalidUrl(url.to_string()))
    }
}

/// Prefix `https://` when the scheme was omitted
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
