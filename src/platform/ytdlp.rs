//! Extractor backed by the `yt-dlp` executable

use crate::core::video_info::{FormatDescriptor, VideoMetadata};
use crate::error::TubeError;
use crate::platform::client::MediaClient;
use crate::platform::extractor::{Extractor, MediaStream};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default metadata timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Top-level record printed by `yt-dlp --dump-single-json`
#[derive(Debug, Deserialize)]
struct RawInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    is_live: Option<bool>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    format_note: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    vbr: Option<f64>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
}

fn present_codec(codec: &Option<String>) -> Option<&str> {
    codec.as_deref().filter(|c| !c.is_empty() && *c != "none")
}

fn is_height_label(note: &str) -> bool {
    let digits = note.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && note[digits..].starts_with('p')
}

impl RawFormat {
    fn into_descriptor(self, is_live: bool) -> FormatDescriptor {
        let vcodec = present_codec(&self.vcodec).map(str::to_string);
        let acodec = present_codec(&self.acodec).map(str::to_string);

        let quality_label = vcodec.as_ref().and_then(|_| match &self.format_note {
            Some(note) if is_height_label(note) => Some(note.clone()),
            _ => self.height.map(|h| format!("{}p", h)),
        });
        let bitrate = quality_label
            .as_ref()
            .and_then(|_| self.vbr.or(self.tbr))
            .map(|kbps| kbps.round() as u64);
        let audio_bitrate = acodec
            .as_ref()
            .map(|_| self.abr.map(|kbps| kbps.round() as u64).unwrap_or(0));

        let codecs = [vcodec, acodec]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        FormatDescriptor {
            itag: self.format_id,
            url: self.url.unwrap_or_default(),
            container: self.ext.unwrap_or_default(),
            quality_label,
            codecs,
            bitrate,
            audio_bitrate,
            content_length: self.filesize,
            is_live,
            http_headers: self.http_headers,
        }
    }
}

/// Map a `--dump-single-json` record to the metadata model
pub fn parse_info(raw: serde_json::Value) -> Result<VideoMetadata, TubeError> {
    let info: RawInfo = serde_json::from_value(raw.clone())?;
    let is_live = info.is_live.unwrap_or(false);

    let mut metadata = VideoMetadata::new(info.id, info.title.unwrap_or_default());
    metadata.author = info.uploader.or(info.channel).unwrap_or_default();
    metadata.view_count = info.view_count;
    metadata.average_rating = info.average_rating;
    metadata.duration = if is_live { None } else { info.duration };
    metadata.is_live = is_live;
    metadata.formats = info
        .formats
        .into_iter()
        .map(|f| f.into_descriptor(is_live))
        .collect();
    metadata.raw = Some(raw);

    Ok(metadata)
}

/// Last non-empty stderr line without yt-dlp's "ERROR: " prefix
fn failure_message(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("yt-dlp exited without output");
    line.strip_prefix("ERROR: ").unwrap_or(line).to_string()
}

/// yt-dlp backed extractor
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    timeout: Duration,
    http: MediaClient,
}

impl YtDlp {
    /// Create an extractor invoking `binary`
    pub fn new(binary: impl Into<String>) -> Result<Self, TubeError> {
        Ok(Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
            http: MediaClient::new()?,
        })
    }

    /// Set the metadata timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "--dump-single-json",
            "--no-playlist",
            "--no-warnings",
            "--skip-download",
            url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Extractor for YtDlp {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn get_metadata(&self, url: &str) -> Result<VideoMetadata, TubeError> {
        debug!("Running {} for {}", self.binary, url);

        let output = tokio::time::timeout(self.timeout, self.command(url).output())
            .await
            .map_err(|_| {
                TubeError::Extraction(format!(
                    "{} timed out after {}",
                    self.binary,
                    humantime::format_duration(self.timeout)
                ))
            })?
            .map_err(|e| TubeError::Extraction(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(TubeError::Extraction(failure_message(&output.stderr)));
        }

        let raw: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let metadata = parse_info(raw)?;
        info!(
            "Fetched \"{}\" with {} formats",
            metadata.title,
            metadata.formats.len()
        );
        Ok(metadata)
    }

    async fn open_stream(&self, format: &FormatDescriptor) -> Result<MediaStream, TubeError> {
        self.http.open(format).await
    }
}
