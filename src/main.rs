//! Main entry point for the tubedl CLI

use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use std::future::Future;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tubedl::cli::{Args, Mode, OutputFormatter, VerbosityLevel};
use tubedl::utils::validate_url;
use tubedl::{Config, Downloader, YtDlp};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => return parse_failure(e),
    };

    init_logging(args.verbosity_level());
    Config::load_dotenv();
    debug!("Starting tubedl with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level());
    match run(&args, &formatter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Run failed ({:?}): {:?}", e.kind(), e);
            formatter.error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Help and version exit cleanly; every other parse error is a failure
fn parse_failure(error: clap::Error) -> ExitCode {
    match error.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
            let _ = error.print();
            ExitCode::SUCCESS
        }
        _ => {
            OutputFormatter::new(VerbosityLevel::Normal).usage_error(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, formatter: &OutputFormatter) -> tubedl::Result<()> {
    // Reject bad URLs before any process or network work
    validate_url(&args.url)?;
    let output_name = args.output_name()?;

    let config = Config::from_env()?;
    let extractor = YtDlp::new(config.ytdlp_path.as_str())?.with_timeout(args.timeout_duration());

    let mut downloader = Downloader::new(extractor, config)
        .with_filter(args.filter_mode())
        .with_quality(args.quality_hint());
    if let Some(name) = output_name {
        downloader = downloader.with_output_name(name);
    }
    if let Some(ext) = args.ext {
        downloader = downloader.with_extension(ext.as_str());
    }

    match args.mode() {
        Mode::Info => handle_info(&downloader, args, formatter).await,
        Mode::InfoJson => handle_info_export(&downloader, args, formatter).await,
        Mode::PrintUrl => handle_print_url(&downloader, args, formatter).await,
        Mode::Download => handle_download(&downloader, args, formatter).await,
    }
}

/// Print the info and format tables
async fn handle_info(
    downloader: &Downloader<YtDlp>,
    args: &Args,
    formatter: &OutputFormatter,
) -> tubedl::Result<()> {
    let metadata =
        with_spinner(formatter, "Get video data ...", downloader.fetch_info(&args.url)).await?;

    formatter.print_video_info(&metadata);
    println!();
    println!();
    formatter.print_formats(&metadata);
    Ok(())
}

/// Export the metadata record as JSON
async fn handle_info_export(
    downloader: &Downloader<YtDlp>,
    args: &Args,
    formatter: &OutputFormatter,
) -> tubedl::Result<()> {
    let metadata =
        with_spinner(formatter, "Get video data ...", downloader.fetch_info(&args.url)).await?;

    let path = downloader.export_info(&metadata).await?;
    formatter.print_export(&path);
    Ok(())
}

/// Print the direct media URL of the chosen format
async fn handle_print_url(
    downloader: &Downloader<YtDlp>,
    args: &Args,
    formatter: &OutputFormatter,
) -> tubedl::Result<()> {
    let (url, _metadata) = with_spinner(
        formatter,
        "Get direct download URL...",
        downloader.resolve_url(&args.url),
    )
    .await?;

    formatter.print_url(&url);
    Ok(())
}

/// Download the chosen format into the download directory
async fn handle_download(
    downloader: &Downloader<YtDlp>,
    args: &Args,
    formatter: &OutputFormatter,
) -> tubedl::Result<()> {
    let metadata =
        with_spinner(formatter, "Get video data ...", downloader.fetch_info(&args.url)).await?;
    let prepared = downloader.prepare(metadata)?;
    info!(
        "Downloading itag {} to {}",
        prepared.format.itag,
        prepared.output_path.display()
    );

    let stream = with_spinner(formatter, "Reading stream...", downloader.open_stream(&prepared))
        .await?;

    if args.verbosity_level() != VerbosityLevel::Quiet {
        formatter.print_video_info(&prepared.metadata);
    }
    formatter.print_format_info(&prepared.format, &prepared.file_name());

    let mutable_terminal = std::io::stdout().is_terminal() && !args.no_progress;
    let view = formatter.progress_view(mutable_terminal);

    let started = Instant::now();
    let bytes = downloader.save(&prepared, stream, view).await?;
    formatter.print_download_complete(&prepared.output_path, bytes, started.elapsed());
    Ok(())
}

/// Show a spinner with `message` while `task` runs
async fn with_spinner<T, F>(
    formatter: &OutputFormatter,
    message: &str,
    task: F,
) -> tubedl::Result<T>
where
    F: Future<Output = tubedl::Result<T>>,
{
    let spinner = formatter.spinner(message);
    let result = task.await;
    spinner.finish_and_clear();
    result
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Verbose => "tubedl=debug",
        VerbosityLevel::Normal | VerbosityLevel::Quiet => "warn",
    };

    // RUST_LOG wins over the flag-derived default
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so they never interleave with requested data on stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
