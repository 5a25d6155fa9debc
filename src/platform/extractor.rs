//! Seam between the downloader and the media extraction collaborator

use crate::core::video_info::{FormatDescriptor, VideoMetadata};
use crate::error::TubeError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Event emitted by an open media stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Response headers arrived
    Response {
        /// Value of the `content-length` header, if any
        content_length: Option<u64>,
    },
    /// A chunk of media bytes
    Data(Bytes),
}

/// Byte stream of one format. Ends with `None`; an `Err` item is terminal.
pub type MediaStream = BoxStream<'static, Result<StreamEvent, TubeError>>;

/// Turns a video URL into metadata and media streams
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Fetch metadata and the format catalog for `url`
    async fn get_metadata(&self, url: &str) -> Result<VideoMetadata, TubeError>;

    /// Open the byte stream of an already chosen format
    async fn open_stream(&self, format: &FormatDescriptor) -> Result<MediaStream, TubeError>;
}
