//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::cli::table::{render_key_values, render_table};
use crate::core::human::{format_bitrate, format_count, human_size, human_time};
use crate::core::progress::ProgressView;
use crate::core::video_info::{FormatDescriptor, VideoMetadata};
use crate::error::TubeError;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{bar:50} {percent}% {msg} | ETA: {eta}";
const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Output formatter for tubedl
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    fn quiet(&self) -> bool {
        self.verbosity == VerbosityLevel::Quiet
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if !self.quiet() {
            println!("{}", format!("✔ {}", message).green().bold());
        }
    }

    /// Print an error. Every failure of a run ends up here.
    pub fn error(&self, error: &TubeError) {
        eprintln!("{}", format!("❌ {}", error).red().bold());
    }

    /// Print a clap parse error in the same style
    pub fn usage_error(&self, message: &str) {
        eprintln!("{}", format!("❌ {}", message.trim_end()).red().bold());
    }

    /// Start a spinner with `message`; hidden in quiet mode
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.quiet() {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner
    }

    /// Print the basic info table
    pub fn print_video_info(&self, metadata: &VideoMetadata) {
        println!();
        println!("{}", render_key_values(&video_info_rows(metadata)));
    }

    /// Print the table of every format
    pub fn print_formats(&self, metadata: &VideoMetadata) {
        let rows: Vec<Vec<String>> = metadata.formats.iter().map(format_row).collect();
        println!("{}", "formats:".cyan().bold());
        println!();
        println!("{}", render_table(&FORMAT_HEADERS, &rows));
    }

    /// Print the chosen format ahead of a download
    pub fn print_format_info(&self, format: &FormatDescriptor, output: &str) {
        if self.quiet() {
            return;
        }
        println!();
        println!("{}", render_key_values(&chosen_format_rows(format, output)));
    }

    /// Print where the JSON export went
    pub fn print_export(&self, path: &Path) {
        if self.quiet() {
            return;
        }
        let dir = path.parent().unwrap_or(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.success("Exported successfully");
        println!();
        println!("  - In {}", dir.display());
        println!("  - Name as {}", name.cyan());
    }

    /// Print the resolved media URL
    pub fn print_url(&self, url: &str) {
        println!("{}", url.green());
    }

    /// Print download complete message
    pub fn print_download_complete(&self, output: &Path, bytes: u64, elapsed: Duration) {
        if self.quiet() {
            return;
        }
        println!();
        self.success(&format!(
            "Saved {} to {} in {}",
            human_size(bytes),
            output.display(),
            human_time(elapsed.as_secs_f64())
        ));
    }

    /// Pick the progress view for this terminal
    pub fn progress_view(&self, mutable_terminal: bool) -> ConsoleView {
        if self.quiet() {
            ConsoleView::Hidden
        } else if mutable_terminal {
            ConsoleView::Bar(None)
        } else {
            ConsoleView::SizeOnly
        }
    }
}

const FORMAT_HEADERS: [&str; 7] = [
    "itag",
    "container",
    "quality",
    "codecs",
    "bitrate",
    "audio bitrate",
    "size",
];

fn video_info_rows(metadata: &VideoMetadata) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("title", metadata.title.clone()),
        ("author", metadata.author.clone()),
        (
            "avg rating",
            metadata
                .average_rating
                .map(|r| r.to_string())
                .unwrap_or_default(),
        ),
        (
            "views",
            metadata.view_count.map(format_count).unwrap_or_default(),
        ),
    ];
    if !metadata.has_live_format() {
        rows.push((
            "length",
            human_time(metadata.duration.unwrap_or_default()),
        ));
    }
    rows
}

fn format_row(format: &FormatDescriptor) -> Vec<String> {
    vec![
        format.itag.clone(),
        format.container.clone(),
        format.quality_label.clone().unwrap_or_default(),
        format.codecs.clone(),
        format
            .quality_label
            .as_ref()
            .and(format.bitrate)
            .map(format_bitrate)
            .unwrap_or_default(),
        format.audio_bitrate.map(format_bitrate).unwrap_or_default(),
        format.content_length.map(human_size).unwrap_or_default(),
    ]
}

fn chosen_format_rows(format: &FormatDescriptor, output: &str) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("itag", format.itag.clone()),
        ("container", format.container.clone()),
    ];
    if let Some(label) = &format.quality_label {
        rows.push(("quality", label.clone()));
        rows.push((
            "video bitrate",
            format.bitrate.map(format_bitrate).unwrap_or_default(),
        ));
    }
    if let Some(kbps) = format.audio_bitrate {
        rows.push(("audio bitrate", format_bitrate(kbps)));
    }
    rows.push(("codecs", format.codecs.clone()));
    rows.push(("output", output.to_string()));
    rows
}

/// Terminal rendering of a transfer
pub enum ConsoleView {
    /// Redrawing bar, created once the size is known
    Bar(Option<ProgressBar>),
    /// Terminal cannot redraw: print the size, nothing else
    SizeOnly,
    /// Quiet mode
    Hidden,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#-")
}

impl ProgressView for ConsoleView {
    fn begin(&mut self, total: u64) {
        if matches!(self, ConsoleView::Hidden) {
            return;
        }
        println!("{}{}", "size: ".bold(), human_size(total));
        println!();

        if let ConsoleView::Bar(bar) = self {
            let progress = ProgressBar::new(total);
            progress.set_style(bar_style());
            *bar = Some(progress);
        }
    }

    fn update(&mut self, position: u64, speed: &str) {
        if let ConsoleView::Bar(Some(bar)) = self {
            bar.set_position(position);
            bar.set_message(speed.to_string());
        }
    }

    fn finish(&mut self) {
        if let ConsoleView::Bar(Some(bar)) = self {
            bar.finish();
        }
    }

    fn abandon(&mut self) {
        if let ConsoleView::Bar(Some(bar)) = self {
            bar.abandon();
        }
    }
}
