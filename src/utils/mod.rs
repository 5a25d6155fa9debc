//! Utility functions for tubedl

pub mod filename;
pub mod url;

pub use filename::*;
pub use url::*;
