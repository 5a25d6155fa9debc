//! Download orchestration: metadata, format choice, export and transfer

use crate::config::Config;
use crate::core::filter::{choose_format, select_predicate, FilterMode, Predicate, QualityHint};
use crate::core::progress::{run_transfer, ProgressReporter, ProgressView, SPEED_REFRESH};
use crate::core::video_info::{FormatDescriptor, VideoMetadata};
use crate::error::TubeError;
use crate::platform::{Extractor, MediaStream};
use crate::utils::{normalize_url, sanitize, validate_url};
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::BufWriter;
use tracing::{debug, info};

/// Extension used when none was requested
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Replacement for unsafe characters in download file names
const DOWNLOAD_REPLACEMENT: &str = "-";

/// User choices that shape a download
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Filter mode
    pub filter: FilterMode,
    /// Quality hint for the choice algorithm
    pub quality: QualityHint,
    /// Output file name without extension; the title is used when absent
    pub output_name: Option<String>,
    /// Output extension; `mp4` when absent
    pub extension: Option<String>,
}

/// A chosen format together with where it will be written
#[derive(Debug, Clone)]
pub struct PreparedDownload {
    /// Metadata of the video
    pub metadata: VideoMetadata,
    /// Chosen format
    pub format: FormatDescriptor,
    /// Target file
    pub output_path: PathBuf,
}

impl PreparedDownload {
    /// File name part of the target path
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Main downloader
pub struct Downloader<E> {
    extractor: E,
    config: Config,
    options: DownloadOptions,
}

impl<E: Extractor> Downloader<E> {
    /// Create a downloader with default options
    pub fn new(extractor: E, config: Config) -> Self {
        Self {
            extractor,
            config,
            options: DownloadOptions::default(),
        }
    }

    /// Set filter mode
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.options.filter = filter;
        self
    }

    /// Set quality hint
    pub fn with_quality(mut self, quality: QualityHint) -> Self {
        self.options.quality = quality;
        self
    }

    /// Set output file name (without extension)
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.options.output_name = Some(name.into());
        self
    }

    /// Set output extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.options.extension = Some(extension.into());
        self
    }

    /// Predicates built from the active filter mode
    pub fn predicates(&self) -> Vec<Predicate> {
        vec![select_predicate(self.options.filter)]
    }

    /// Validate `url` and fetch its metadata
    pub async fn fetch_info(&self, url: &str) -> Result<VideoMetadata, TubeError> {
        validate_url(url)?;
        let url = normalize_url(url);
        debug!("Fetching metadata via {} for {}", self.extractor.name(), url);
        self.extractor.get_metadata(&url).await
    }

    /// Write the metadata record as JSON into the report directory.
    ///
    /// Returns the path of the written file.
    pub async fn export_info(&self, metadata: &VideoMetadata) -> Result<PathBuf, TubeError> {
        fs::create_dir_all(&self.config.report_dir).await?;

        let stem = sanitize(&metadata.title, "");
        let stem = if stem.is_empty() {
            sanitize(&metadata.id, "")
        } else {
            stem
        };
        let path = self.config.report_dir.join(format!("{}.json", stem));

        fs::write(&path, metadata.to_pretty_json()?).await?;
        info!("Exported metadata to {}", path.display());
        Ok(path)
    }

    /// Choose a format from `metadata` with the active filter and quality
    pub fn select_format<'a>(
        &self,
        metadata: &'a VideoMetadata,
    ) -> Result<&'a FormatDescriptor, TubeError> {
        let format = choose_format(&metadata.formats, &self.predicates(), &self.options.quality)?;
        debug!(
            "Chose itag {} ({}, {})",
            format.itag,
            format.container,
            format.quality_label.as_deref().unwrap_or("audio")
        );
        Ok(format)
    }

    /// Resolve the direct media URL without downloading
    pub async fn resolve_url(&self, url: &str) -> Result<(String, VideoMetadata), TubeError> {
        let metadata = self.fetch_info(url).await?;
        let direct = self.select_format(&metadata)?.url.clone();
        Ok((direct, metadata))
    }

    /// Target path for `metadata` under the download directory
    pub fn output_path(&self, metadata: &VideoMetadata) -> PathBuf {
        let name = self.options.output_name.as_deref().unwrap_or(&metadata.title);
        let mut stem = sanitize(name, DOWNLOAD_REPLACEMENT);
        if stem.is_empty() {
            stem = sanitize(&metadata.id, DOWNLOAD_REPLACEMENT);
        }
        if stem.is_empty() {
            stem = "video".to_string();
        }

        let extension = self
            .options
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION);

        self.config.download_dir.join(format!("{}.{}", stem, extension))
    }

    /// Pick the format and target path for an already fetched video
    pub fn prepare(&self, metadata: VideoMetadata) -> Result<PreparedDownload, TubeError> {
        let format = self.select_format(&metadata)?.clone();
        let output_path = self.output_path(&metadata);
        Ok(PreparedDownload {
            metadata,
            format,
            output_path,
        })
    }

    /// Open the media stream of a prepared download
    pub async fn open_stream(&self, prepared: &PreparedDownload) -> Result<MediaStream, TubeError> {
        self.extractor.open_stream(&prepared.format).await
    }

    /// Write an opened stream to the prepared target, reporting progress to
    /// `view`. Returns the number of bytes written.
    pub async fn save<V: ProgressView>(
        &self,
        prepared: &PreparedDownload,
        stream: MediaStream,
        view: V,
    ) -> Result<u64, TubeError> {
        fs::create_dir_all(&self.config.download_dir).await?;
        let file = File::create(&prepared.output_path).await?;
        let mut sink = BufWriter::new(file);

        let mut reporter = ProgressReporter::new(view);
        match prepared.format.content_length {
            Some(total) => reporter.start(total),
            None => debug!("Size unknown until the response arrives"),
        }

        let written = run_transfer(stream, &mut sink, &mut reporter, SPEED_REFRESH).await?;
        info!("Saved {} bytes to {}", written, prepared.output_path.display());
        Ok(written)
    }

    /// Open and save in one step
    pub async fn download<V: ProgressView>(
        &self,
        prepared: &PreparedDownload,
        view: V,
    ) -> Result<u64, TubeError> {
        let stream = self.open_stream(prepared).await?;
        self.save(prepared, stream, view).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::tests::RecordingView;
    use crate::platform::StreamEvent;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Extractor serving a fixed catalog and a scripted stream
    struct StubExtractor {
        metadata: VideoMetadata,
        response_length: Option<u64>,
        chunks: Vec<&'static [u8]>,
        fail_stream: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubExtractor {
        fn new(metadata: VideoMetadata) -> Self {
            Self {
                metadata,
                response_length: None,
                chunks: Vec::new(),
                fail_stream: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn get_metadata(&self, _url: &str) -> Result<VideoMetadata, TubeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.metadata.clone())
        }

        async fn open_stream(&self, _format: &FormatDescriptor) -> Result<MediaStream, TubeError> {
            let mut events = vec![Ok(StreamEvent::Response {
                content_length: self.response_length,
            })];
            events.extend(
                self.chunks
                    .iter()
                    .map(|chunk| Ok(StreamEvent::Data(Bytes::from_static(chunk)))),
            );
            if self.fail_stream {
                events.push(Err(TubeError::Extraction("connection reset".to_string())));
            }
            Ok(stream::iter(events).boxed())
        }
    }

    fn metadata() -> VideoMetadata {
        let mut metadata = VideoMetadata::new("abc123", "My Video: Part 1?");
        metadata.author = "Someone".to_string();
        metadata.formats = vec![
            FormatDescriptor::new("140", "m4a").with_audio(128),
            FormatDescriptor::new("137", "mp4").with_video("1080p", 4000),
            FormatDescriptor::new("18", "mp4")
                .with_video("360p", 500)
                .with_audio(96),
        ];
        metadata
    }

    fn config(root: &Path) -> Config {
        Config::resolve(root, None, None)
    }

    #[tokio::test]
    async fn test_fetch_info_rejects_invalid_url_without_calling_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(metadata());
        let calls = stub.calls.clone();
        let downloader = Downloader::new(stub, config(dir.path()));

        let err = downloader
            .fetch_info("https://example.com/watch?v=x")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_export_info_writes_sanitized_json() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(StubExtractor::new(metadata()), config(dir.path()));

        let metadata = downloader.fetch_info("youtu.be/abc123").await.unwrap();
        let path = downloader.export_info(&metadata).await.unwrap();

        assert_eq!(path, dir.path().join("tube/reports/My Video Part 1.json"));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["title"], "My Video: Part 1?");
        assert_eq!(written["formats"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_output_path_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(StubExtractor::new(metadata()), config(dir.path()));
        assert_eq!(
            downloader.output_path(&metadata()),
            dir.path().join("tube/downloads/My Video- Part 1-.mp4")
        );
    }

    #[test]
    fn test_output_path_with_name_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(StubExtractor::new(metadata()), config(dir.path()))
            .with_output_name("song")
            .with_extension("mp3");
        assert_eq!(
            downloader.output_path(&metadata()),
            dir.path().join("tube/downloads/song.mp3")
        );
    }

    #[test]
    fn test_output_path_falls_back_to_id() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(StubExtractor::new(metadata()), config(dir.path()));
        let mut untitled = metadata();
        untitled.title = "...".to_string();
        // "..." is reserved and becomes "-"
        assert_eq!(
            downloader.output_path(&untitled),
            dir.path().join("tube/downloads/-.mp4")
        );
        untitled.title = String::new();
        assert_eq!(
            downloader.output_path(&untitled),
            dir.path().join("tube/downloads/abc123.mp4")
        );
    }

    #[tokio::test]
    async fn test_resolve_url_uses_filter_and_quality() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = metadata();
        for format in &mut meta.formats {
            format.url = format!("https://media.example/{}", format.itag);
        }

        let downloader = Downloader::new(StubExtractor::new(meta), config(dir.path()))
            .with_filter(FilterMode::VideoOnly);
        let (url, _) = downloader
            .resolve_url("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap();
        assert_eq!(url, "https://media.example/137");
    }

    #[test]
    fn test_prepare_reports_no_matching_format() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(StubExtractor::new(metadata()), config(dir.path()))
            .with_quality("999".parse().unwrap());
        let err = downloader.prepare(metadata()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No videos matching quality: 999 & filters: audio"
        );
    }

    #[tokio::test]
    async fn test_download_starts_bar_once_from_response_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubExtractor::new(metadata());
        stub.response_length = Some(5000);
        stub.chunks = vec![b"hello ", b"world"];
        let downloader = Downloader::new(stub, config(dir.path()));

        let prepared = downloader.prepare(metadata()).unwrap();
        assert_eq!(prepared.format.content_length, None);

        let mut view = RecordingView::default();
        let written = downloader.download(&prepared, &mut view).await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(view.begins, vec![5000]);
        assert!(view.finished);
        assert_eq!(
            std::fs::read(&prepared.output_path).unwrap(),
            b"hello world"
        );
    }

    #[tokio::test]
    async fn test_download_known_length_ignores_response_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = metadata();
        for format in &mut meta.formats {
            format.content_length = Some(11);
        }
        let mut stub = StubExtractor::new(meta.clone());
        stub.response_length = Some(5000);
        stub.chunks = vec![b"hello world"];
        let downloader = Downloader::new(stub, config(dir.path()));

        let prepared = downloader.prepare(meta).unwrap();
        let mut view = RecordingView::default();
        downloader.download(&prepared, &mut view).await.unwrap();

        assert_eq!(view.begins, vec![11]);
    }

    #[tokio::test]
    async fn test_download_without_length_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubExtractor::new(metadata());
        stub.chunks = vec![b"abc"];
        let downloader = Downloader::new(stub, config(dir.path()));

        let prepared = downloader.prepare(metadata()).unwrap();
        let mut view = RecordingView::default();
        let written = downloader.download(&prepared, &mut view).await.unwrap();

        assert_eq!(written, 3);
        assert!(view.begins.is_empty());
        assert!(view.updates.is_empty());
        assert!(!view.finished);
    }

    #[tokio::test]
    async fn test_download_stream_error_abandons_bar() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubExtractor::new(metadata());
        stub.response_length = Some(100);
        stub.chunks = vec![b"partial"];
        stub.fail_stream = true;
        let downloader = Downloader::new(stub, config(dir.path()));

        let prepared = downloader.prepare(metadata()).unwrap();
        let mut view = RecordingView::default();
        let err = downloader.download(&prepared, &mut view).await.unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert!(view.abandoned);
        assert!(!view.finished);
    }
}
