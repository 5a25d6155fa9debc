//! Video information structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Video metadata as reported by the extraction collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video ID
    pub id: String,
    /// Video title
    pub title: String,
    /// Video author/channel name
    pub author: String,
    /// View count
    pub view_count: Option<u64>,
    /// Average rating
    pub average_rating: Option<f64>,
    /// Duration in seconds (absent for live streams)
    pub duration: Option<f64>,
    /// Whether the video is a live stream
    pub is_live: bool,
    /// Available formats
    pub formats: Vec<FormatDescriptor>,
    /// Record exactly as the collaborator returned it
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
}

impl VideoMetadata {
    /// Create a new metadata record
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: String::new(),
            view_count: None,
            average_rating: None,
            duration: None,
            is_live: false,
            formats: Vec::new(),
            raw: None,
        }
    }

    /// Check if any format is a live stream
    pub fn has_live_format(&self) -> bool {
        self.is_live || self.formats.iter().any(|f| f.is_live)
    }

    /// Serialize the full record as indented JSON.
    ///
    /// The collaborator's raw record wins when it is available.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        match &self.raw {
            Some(raw) => serde_json::to_string_pretty(raw),
            None => serde_json::to_string_pretty(self),
        }
    }
}

/// One downloadable variant of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Format tag (itag)
    pub itag: String,
    /// Direct media URL
    pub url: String,
    /// Container / file type (e.g. "mp4", "webm", "m4a")
    pub container: String,
    /// Quality label (e.g. "720p"), only for formats with a video track
    pub quality_label: Option<String>,
    /// Codec string (e.g. "avc1.64001F, mp4a.40.2")
    pub codecs: String,
    /// Video bitrate in kbps
    pub bitrate: Option<u64>,
    /// Audio bitrate in kbps
    pub audio_bitrate: Option<u64>,
    /// Content length in bytes (if known)
    pub content_length: Option<u64>,
    /// Whether the format is a live stream
    pub is_live: bool,
    /// Headers the media URL must be requested with
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl FormatDescriptor {
    /// Create a new format descriptor with only the identifying fields set
    pub fn new(itag: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            itag: itag.into(),
            url: String::new(),
            container: container.into(),
            quality_label: None,
            codecs: String::new(),
            bitrate: None,
            audio_bitrate: None,
            content_length: None,
            is_live: false,
            http_headers: BTreeMap::new(),
        }
    }

    /// Set quality label and video bitrate
    pub fn with_video(mut self, quality_label: &str, bitrate: u64) -> Self {
        self.quality_label = Some(quality_label.to_string());
        self.bitrate = Some(bitrate);
        self
    }

    /// Set audio bitrate
    pub fn with_audio(mut self, audio_bitrate: u64) -> Self {
        self.audio_bitrate = Some(audio_bitrate);
        self
    }

    /// Set content length
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// Set direct media URL
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Check if the format carries a video track
    pub fn has_video(&self) -> bool {
        self.quality_label.is_some()
    }

    /// Check if the format carries an audio track
    pub fn has_audio(&self) -> bool {
        self.audio_bitrate.is_some()
    }

    /// Vertical resolution parsed from the quality label ("1080p60" -> 1080)
    pub fn height(&self) -> Option<u32> {
        let label = self.quality_label.as_deref()?;
        let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tracks() {
        let combined = FormatDescriptor::new("18", "mp4")
            .with_video("360p", 500)
            .with_audio(96);
        assert!(combined.has_video());
        assert!(combined.has_audio());

        let audio = FormatDescriptor::new("140", "m4a").with_audio(128);
        assert!(!audio.has_video());
        assert!(audio.has_audio());
    }

    #[test]
    fn test_format_height() {
        assert_eq!(
            FormatDescriptor::new("299", "mp4")
                .with_video("1080p60", 4000)
                .height(),
            Some(1080)
        );
        assert_eq!(FormatDescriptor::new("140", "m4a").height(), None);
    }

    #[test]
    fn test_metadata_live_detection() {
        let mut info = VideoMetadata::new("abc", "Live");
        assert!(!info.has_live_format());

        let mut format = FormatDescriptor::new("95", "mp4");
        format.is_live = true;
        info.formats.push(format);
        assert!(info.has_live_format());
    }

    #[test]
    fn test_pretty_json_prefers_raw_record() {
        let mut info = VideoMetadata::new("abc", "Title");
        let json = info.to_pretty_json().unwrap();
        assert!(json.contains("\"title\": \"Title\""));

        info.raw = Some(serde_json::json!({ "fulltitle": "Raw Title" }));
        let json = info.to_pretty_json().unwrap();
        assert!(json.contains("\"fulltitle\": \"Raw Title\""));
        assert!(!json.contains("\"formats\""));
    }
}
