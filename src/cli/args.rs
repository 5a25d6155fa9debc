//! Command line argument parsing

use crate::core::filter::{FilterMode, QualityHint};
use crate::error::TubeError;
use clap::{ArgAction, Parser, ValueEnum};
use std::time::Duration;

const AFTER_HELP: &str = "\
Usage:
  $ tubedl -i <url>
  $ tubedl -o videoTitle <url>

Examples:
  $ tubedl \"http://www.youtube.com/watch?v=AwRAfxBub9M\"
  $ tubedl -o \"new song\" \"http://www.youtube.com/watch?v=AwRAfxBub9M\"";

/// tubedl - download YouTube videos and audio from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "tubedl",
    version,
    about,
    long_about = None,
    disable_version_flag = true,
    after_help = AFTER_HELP
)]
pub struct Args {
    /// YouTube video URL
    pub url: String,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Show video info instead of downloading. `--info=json` exports it;
    /// the value must be attached with `=`
    #[arg(
        short,
        long,
        value_enum,
        value_name = "FORMAT",
        num_args = 0..=1,
        require_equals = true
    )]
    pub info: Option<Option<InfoFormat>>,

    /// Quality: highest, lowest, highestaudio, lowestaudio, highestvideo,
    /// lowestvideo, an itag or a comma separated itag list
    #[arg(short, long, value_name = "QUALITY")]
    pub quality: Option<QualityHint>,

    /// Output file name, without extension
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Format filter
    #[arg(short, long, value_enum, value_name = "FILTER")]
    pub filter: Option<FilterArg>,

    /// Print the direct media URL and exit
    #[arg(short, long)]
    pub print_url: bool,

    /// Output file extension
    #[arg(short, long, value_enum, value_name = "EXT")]
    pub ext: Option<Extension>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Metadata timeout (e.g. 30s, 2m)
    #[arg(long, value_name = "DURATION", default_value = "60s")]
    pub timeout: humantime::Duration,

    /// Verbose output
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet output (only errors and requested data)
    #[arg(long)]
    pub quiet: bool,
}

/// Info output format
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum InfoFormat {
    /// Export the full record as JSON
    Json,
}

/// Filter values accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FilterArg {
    /// Accepted for compatibility; downloads like `audio`
    Video,
    /// Formats with video and no audio
    #[value(name = "videoonly")]
    VideoOnly,
    /// Formats with an audio track
    Audio,
}

impl From<FilterArg> for FilterMode {
    fn from(arg: FilterArg) -> Self {
        match arg {
            // `video` has no catalog filter of its own on the command line
            FilterArg::Video => FilterMode::Audio,
            FilterArg::VideoOnly => FilterMode::VideoOnly,
            FilterArg::Audio => FilterMode::Audio,
        }
    }
}

/// Output extensions
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Extension {
    Mp3,
    Mp4,
}

impl Extension {
    /// Extension without the dot
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Mp3 => "mp3",
            Extension::Mp4 => "mp4",
        }
    }
}

/// What the run should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print info tables
    Info,
    /// Export info as JSON
    InfoJson,
    /// Print the direct media URL
    PrintUrl,
    /// Download the chosen format
    Download,
}

impl Args {
    /// Resolve the run mode; info wins over print-url
    pub fn mode(&self) -> Mode {
        match self.info {
            Some(Some(InfoFormat::Json)) => Mode::InfoJson,
            Some(None) => Mode::Info,
            None if self.print_url => Mode::PrintUrl,
            None => Mode::Download,
        }
    }

    /// Filter mode, `audio` when not given
    pub fn filter_mode(&self) -> FilterMode {
        self.filter.map(FilterMode::from).unwrap_or_default()
    }

    /// Output name, rejecting a blank `-o`
    pub fn output_name(&self) -> Result<Option<&str>, TubeError> {
        match self.output.as_deref() {
            Some(name) if name.trim().is_empty() => Err(TubeError::InvalidOption(
                "output name must not be empty".to_string(),
            )),
            name => Ok(name),
        }
    }

    /// Quality hint, `highest` when not given
    pub fn quality_hint(&self) -> QualityHint {
        self.quality.clone().unwrap_or_default()
    }

    /// Get metadata timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}
