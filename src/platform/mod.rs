//! Media extraction: the collaborator seam, yt-dlp backend, and format ranking

pub mod client;
pub mod extractor;
pub mod formats;
pub mod ytdlp;

pub use client::*;
pub use extractor::*;
pub use formats::*;
pub use ytdlp::*;
