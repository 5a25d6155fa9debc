//! Runtime configuration from the environment

use crate::error::TubeError;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Report directory variable, relative to the working directory
pub const REPORT_PATH_VAR: &str = "DOWNLOAD_REPORT_PATH";
/// Extraction binary variable
pub const YTDLP_VAR: &str = "TUBEDL_YTDLP";

/// Default report directory
pub const DEFAULT_REPORT_PATH: &str = "tube/reports";
/// Download directory, relative to the working directory
pub const DOWNLOAD_PATH: &str = "tube/downloads";
/// Default extraction binary
pub const DEFAULT_YTDLP: &str = "yt-dlp";

/// Directories and tools used by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where downloaded media is written
    pub download_dir: PathBuf,
    /// Where JSON exports are written
    pub report_dir: PathBuf,
    /// yt-dlp executable
    pub ytdlp_path: String,
}

impl Config {
    /// Read a `.env` file into the process environment, if one exists.
    ///
    /// Variables already set in the environment win.
    pub fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("Ignoring unreadable .env: {}", e),
        }
    }

    /// Load from the process environment and working directory
    pub fn from_env() -> Result<Self, TubeError> {
        let cwd = env::current_dir()?;
        Ok(Self::resolve(
            &cwd,
            env::var(REPORT_PATH_VAR).ok().as_deref(),
            env::var(YTDLP_VAR).ok().as_deref(),
        ))
    }

    /// Build a config rooted at `cwd` from optional overrides
    pub fn resolve(cwd: &Path, report_path: Option<&str>, ytdlp: Option<&str>) -> Self {
        let report_path = report_path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_REPORT_PATH);
        // Always relative to the working directory, even with a leading '/'
        let report_dir = cwd.join(report_path.trim_start_matches('/'));

        let ytdlp_path = ytdlp
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_YTDLP)
            .to_string();

        Self {
            download_dir: cwd.join(DOWNLOAD_PATH),
            report_dir,
            ytdlp_path,
        }
    }
}
