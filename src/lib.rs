//! # tubedl
//!
//! Download a YouTube video's media from the terminal.
//!
//! ## Features
//!
//! - Format filtering (`audio`, `video`, `videoonly`) plus quality hints
//! - Live progress bar with a sliding-window speed estimate
//! - Info tables or a JSON export of the full metadata record
//! - Direct media URL printing
//!
//! Metadata extraction is delegated to `yt-dlp`; media bytes are streamed
//! over HTTP.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tubedl::{Config, Downloader, FilterMode, YtDlp};
//! use tubedl::core::progress::ProgressView;
//!
//! struct Silent;
//!
//! impl ProgressView for Silent {
//!     fn begin(&mut self, _total: u64) {}
//!     fn update(&mut self, _position: u64, _speed: &str) {}
//!     fn finish(&mut self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> tubedl::Result<()> {
//!     let downloader = Downloader::new(YtDlp::new("yt-dlp")?, Config::from_env()?)
//!         .with_filter(FilterMode::Video);
//!
//!     let metadata = downloader.fetch_info("https://youtu.be/VIDEO_ID").await?;
//!     let prepared = downloader.prepare(metadata)?;
//!     downloader.download(&prepared, Silent).await?;
//!     println!("Downloaded: {}", prepared.output_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use crate::core::{
    Downloader, FilterMode, FormatDescriptor, PreparedDownload, ProgressReporter, QualityHint,
    VideoMetadata,
};
pub use error::{ErrorKind, TubeError};
pub use platform::{Extractor, YtDlp};

/// Result type alias for tubedl operations
pub type Result<T> = std::result::Result<T, TubeError>;
