//! Core functionality for tubedl

pub mod downloader;
pub mod filter;
pub mod human;
pub mod progress;
pub mod video_info;

pub use downloader::*;
pub use filter::*;
pub use human::*;
pub use progress::*;
pub use video_info::*;
