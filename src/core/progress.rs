//! Progress tracking for downloads
//!
//! A [`ProgressReporter`] is a small state machine (`Idle -> Active ->
//! Completed | Failed`) fed by three kinds of input: byte arrivals, a periodic
//! tick and the end or failure of the stream. [`run_transfer`] is the single
//! task that multiplexes those inputs and owns the periodic timer.

use crate::core::human::format_speed;
use crate::error::TubeError;
use crate::platform::StreamEvent;
use futures_util::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Cadence of the speed refresh, independent of byte arrivals
pub const SPEED_REFRESH: Duration = Duration::from_millis(1000);

/// Label shown before the first throughput sample
pub const SPEED_UNAVAILABLE: &str = "N/A";

/// Sliding-window throughput estimator
#[derive(Debug, Clone)]
pub struct SpeedMeter {
    window: Duration,
    origin: Instant,
    samples: VecDeque<(Instant, u64)>,
    window_bytes: u64,
    sampled: bool,
}

impl SpeedMeter {
    /// Samples older than this are dropped from the estimate
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

    /// Spans shorter than this are stretched to avoid absurd early rates
    const MIN_SPAN: Duration = Duration::from_millis(100);

    /// Create a meter measuring from `origin`
    pub fn new(origin: Instant) -> Self {
        Self::with_window(origin, Self::DEFAULT_WINDOW)
    }

    /// Create a meter with a custom window
    pub fn with_window(origin: Instant, window: Duration) -> Self {
        Self {
            window,
            origin,
            samples: VecDeque::new(),
            window_bytes: 0,
            sampled: false,
        }
    }

    /// Record `bytes` arriving at `now`
    pub fn record(&mut self, bytes: u64, now: Instant) {
        self.samples.push_back((now, bytes));
        self.window_bytes += bytes;
        self.sampled = true;
    }

    /// Bytes per second over the window ending at `now`, `None` before the
    /// first sample
    pub fn rate(&mut self, now: Instant) -> Option<f64> {
        if !self.sampled {
            return None;
        }

        let horizon = now.checked_sub(self.window).unwrap_or(self.origin);
        while let Some(&(at, bytes)) = self.samples.front() {
            if at >= horizon {
                break;
            }
            self.samples.pop_front();
            self.window_bytes -= bytes;
        }

        let start = self.origin.max(horizon);
        let span = now.saturating_duration_since(start).max(Self::MIN_SPAN);
        Some(self.window_bytes as f64 / span.as_secs_f64())
    }

    /// Human-readable rate at `now`, or `"N/A"`
    pub fn label(&mut self, now: Instant) -> String {
        self.rate(now)
            .map(format_speed)
            .unwrap_or_else(|| SPEED_UNAVAILABLE.to_string())
    }
}

/// Rendering side of a progress reporter
pub trait ProgressView {
    /// Transfer size became known; draw an empty bar scaled to `total`
    fn begin(&mut self, total: u64);

    /// Redraw with the current position and speed label
    fn update(&mut self, position: u64, speed: &str);

    /// Stop rendering after a successful transfer
    fn finish(&mut self);

    /// Stop rendering after a failed transfer
    fn abandon(&mut self) {
        self.finish();
    }
}

impl<V: ProgressView + ?Sized> ProgressView for &mut V {
    fn begin(&mut self, total: u64) {
        (**self).begin(total)
    }

    fn update(&mut self, position: u64, speed: &str) {
        (**self).update(position, speed)
    }

    fn finish(&mut self) {
        (**self).finish()
    }

    fn abandon(&mut self) {
        (**self).abandon()
    }
}

impl<V: ProgressView + ?Sized> ProgressView for Box<V> {
    fn begin(&mut self, total: u64) {
        (**self).begin(total)
    }

    fn update(&mut self, position: u64, speed: &str) {
        (**self).update(position, speed)
    }

    fn finish(&mut self) {
        (**self).finish()
    }

    fn abandon(&mut self) {
        (**self).abandon()
    }
}

/// Reporter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// Size not known yet, nothing rendered
    Idle,
    /// Bar is live
    Active,
    /// Stream ended normally
    Completed,
    /// Stream failed
    Failed,
}

/// Progress state of a single transfer plus its view
pub struct ProgressReporter<V> {
    view: V,
    state: ReporterState,
    total: Option<u64>,
    received: u64,
    meter: SpeedMeter,
}

impl<V: ProgressView> ProgressReporter<V> {
    /// Create an idle reporter
    pub fn new(view: V) -> Self {
        Self {
            view,
            state: ReporterState::Idle,
            total: None,
            received: 0,
            meter: SpeedMeter::new(Instant::now()),
        }
    }

    /// Transition `Idle -> Active` with a known total size
    pub fn start(&mut self, total: u64) {
        if self.state != ReporterState::Idle {
            debug!("Ignoring start({}) in state {:?}", total, self.state);
            return;
        }

        self.state = ReporterState::Active;
        self.total = Some(total);
        self.received = 0;
        self.meter = SpeedMeter::new(Instant::now());
        self.view.begin(total);
        self.view.update(0, SPEED_UNAVAILABLE);
    }

    /// Response headers arrived; starts the bar if the size was unknown so far
    pub fn on_response(&mut self, content_length: Option<u64>) {
        match (self.state, content_length) {
            (ReporterState::Idle, Some(total)) => self.start(total),
            (ReporterState::Idle, None) => {
                debug!("Response has no content-length, progress bar disabled")
            }
            _ => {}
        }
    }

    /// A chunk of `bytes` arrived
    pub fn on_chunk(&mut self, bytes: u64) {
        self.received += bytes;
        if self.state != ReporterState::Active {
            return;
        }

        let now = Instant::now();
        self.meter.record(bytes, now);
        let speed = self.meter.label(now);
        self.view.update(self.received, &speed);
    }

    /// Periodic timer fired
    pub fn on_tick(&mut self) {
        if self.state != ReporterState::Active {
            return;
        }

        let speed = self.meter.label(Instant::now());
        self.view.update(self.received, &speed);
    }

    /// Stream ended normally
    pub fn on_end(&mut self) {
        match self.state {
            ReporterState::Active => self.view.finish(),
            ReporterState::Idle => {}
            ReporterState::Completed | ReporterState::Failed => return,
        }
        self.state = ReporterState::Completed;
    }

    /// Stream failed
    pub fn on_error(&mut self) {
        match self.state {
            ReporterState::Active => self.view.abandon(),
            ReporterState::Idle => {}
            ReporterState::Completed | ReporterState::Failed => return,
        }
        self.state = ReporterState::Failed;
    }

    /// Current state
    pub fn state(&self) -> ReporterState {
        self.state
    }

    /// Bytes received so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Target size, once known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Download progress as a percentage (0.0 to 100.0)
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.received as f64 * 100.0 / total as f64),
            _ => None,
        }
    }

    /// Current speed label, `"N/A"` before the first sample
    pub fn speed_label(&mut self) -> String {
        self.meter.label(Instant::now())
    }

    /// Access the view
    pub fn view(&self) -> &V {
        &self.view
    }
}

/// Pump a media stream into `sink` while driving `reporter`.
///
/// Byte arrivals and ticks are handled on the calling task only; the interval
/// lives in this frame and is dropped when the stream ends or fails.
pub async fn run_transfer<S, W, V>(
    events: S,
    sink: &mut W,
    reporter: &mut ProgressReporter<V>,
    cadence: Duration,
) -> Result<u64, TubeError>
where
    S: Stream<Item = Result<StreamEvent, TubeError>> + Unpin,
    W: AsyncWrite + Unpin,
    V: ProgressView,
{
    let outcome = pump(events, sink, reporter, cadence).await;
    match &outcome {
        Ok(written) => {
            debug!("Transfer finished: {} bytes", written);
            reporter.on_end();
        }
        Err(e) => {
            warn!("Transfer failed after {} bytes: {}", reporter.received(), e);
            reporter.on_error();
        }
    }
    outcome
}

async fn pump<S, W, V>(
    mut events: S,
    sink: &mut W,
    reporter: &mut ProgressReporter<V>,
    cadence: Duration,
) -> Result<u64, TubeError>
where
    S: Stream<Item = Result<StreamEvent, TubeError>> + Unpin,
    W: AsyncWrite + Unpin,
    V: ProgressView,
{
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + cadence, cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut written = 0u64;

    loop {
        tokio::select! {
            biased;
            event = events.next() => match event {
                Some(Ok(StreamEvent::Response { content_length })) => {
                    reporter.on_response(content_length);
                }
                Some(Ok(StreamEvent::Data(chunk))) => {
                    sink.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                    reporter.on_chunk(chunk.len() as u64);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
            _ = ticker.tick() => reporter.on_tick(),
        }
    }

    sink.flush().await?;
    Ok(written)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    /// View that records every call
    #[derive(Debug, Default)]
    pub(crate) struct RecordingView {
        pub begins: Vec<u64>,
        pub updates: Vec<(u64, String)>,
        pub finished: bool,
        pub abandoned: bool,
    }

    impl ProgressView for RecordingView {
        fn begin(&mut self, total: u64) {
            self.begins.push(total);
        }

        fn update(&mut self, position: u64, speed: &str) {
            self.updates.push((position, speed.to_string()));
        }

        fn finish(&mut self) {
            self.finished = true;
        }

        fn abandon(&mut self) {
            self.abandoned = true;
        }
    }

    fn data(len: usize) -> Result<StreamEvent, TubeError> {
        Ok(StreamEvent::Data(Bytes::from(vec![0u8; len])))
    }

    #[test]
    fn test_speed_meter_unavailable_before_first_sample() {
        let origin = Instant::now();
        let mut meter = SpeedMeter::new(origin);
        assert_eq!(meter.rate(origin + Duration::from_secs(3)), None);
        assert_eq!(meter.label(origin + Duration::from_secs(3)), "N/A");
    }

    #[test]
    fn test_speed_meter_rate() {
        let origin = Instant::now();
        let mut meter = SpeedMeter::new(origin);
        meter.record(1024, origin + Duration::from_millis(500));
        meter.record(1024, origin + Duration::from_millis(1500));

        let rate = meter.rate(origin + Duration::from_secs(2)).unwrap();
        assert!((rate - 1024.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_meter_holds_between_arrivals() {
        let origin = Instant::now();
        let mut meter = SpeedMeter::new(origin);
        meter.record(4096, origin + Duration::from_secs(1));

        let first = meter.rate(origin + Duration::from_secs(1)).unwrap();
        let later = meter.rate(origin + Duration::from_secs(2)).unwrap();
        assert!(first > 0.0);
        assert!(later > 0.0);
        assert!(later <= first);
    }

    #[test]
    fn test_speed_meter_drops_old_samples() {
        let origin = Instant::now();
        let mut meter = SpeedMeter::with_window(origin, Duration::from_secs(2));
        meter.record(10_000, origin + Duration::from_millis(100));
        meter.record(2_000, origin + Duration::from_secs(4));

        let rate = meter.rate(origin + Duration::from_secs(5)).unwrap();
        assert!((rate - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_reporter_counts_chunks() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(1000);
        for chunk in [100, 200, 300] {
            reporter.on_chunk(chunk);
        }

        assert_eq!(reporter.state(), ReporterState::Active);
        assert_eq!(reporter.received(), 600);
        assert_eq!(reporter.percent(), Some(60.0));
        assert_eq!(reporter.view().updates.last().unwrap().0, 600);
    }

    #[test]
    fn test_tick_without_bytes_reports_unavailable() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(1000);
        reporter.on_tick();

        assert_eq!(reporter.view().updates.last().unwrap(), &(0, "N/A".to_string()));
        assert_eq!(reporter.speed_label(), "N/A");
    }

    #[test]
    fn test_speed_available_after_first_chunk() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(1000);
        reporter.on_chunk(100);
        assert_ne!(reporter.view().updates.last().unwrap().1, "N/A");

        reporter.on_tick();
        assert_ne!(reporter.view().updates.last().unwrap().1, "N/A");
        assert_ne!(reporter.speed_label(), "N/A");
    }

    #[test]
    fn test_start_draws_empty_bar() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(1000);

        assert_eq!(reporter.view().begins, vec![1000]);
        assert_eq!(reporter.view().updates, vec![(0, "N/A".to_string())]);
        assert_eq!(reporter.percent(), Some(0.0));
    }

    #[test]
    fn test_idle_reporter_renders_nothing() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.on_chunk(100);
        reporter.on_tick();
        reporter.on_response(None);
        reporter.on_end();

        assert_eq!(reporter.state(), ReporterState::Completed);
        assert_eq!(reporter.received(), 100);
        assert_eq!(reporter.percent(), None);
        assert!(reporter.view().begins.is_empty());
        assert!(reporter.view().updates.is_empty());
        assert!(!reporter.view().finished);
    }

    #[test]
    fn test_response_starts_idle_reporter_once() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.on_response(Some(5000));
        reporter.on_response(Some(7000));

        assert_eq!(reporter.state(), ReporterState::Active);
        assert_eq!(reporter.total(), Some(5000));
        assert_eq!(reporter.view().begins, vec![5000]);
    }

    #[test]
    fn test_response_ignored_when_already_active() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(1000);
        reporter.on_response(Some(5000));
        assert_eq!(reporter.view().begins, vec![1000]);
    }

    #[test]
    fn test_end_and_error_transitions() {
        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(10);
        reporter.on_end();
        assert_eq!(reporter.state(), ReporterState::Completed);
        assert!(reporter.view().finished);

        reporter.on_error();
        assert_eq!(reporter.state(), ReporterState::Completed);

        let mut reporter = ProgressReporter::new(RecordingView::default());
        reporter.start(10);
        reporter.on_error();
        assert_eq!(reporter.state(), ReporterState::Failed);
        assert!(reporter.view().abandoned);

        let updates = reporter.view().updates.len();
        reporter.on_tick();
        assert_eq!(reporter.view().updates.len(), updates);
    }

    #[tokio::test]
    async fn test_run_transfer_writes_all_bytes() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Response {
                content_length: Some(1000),
            }),
            data(100),
            data(200),
            data(300),
        ]);
        let mut sink: Vec<u8> = Vec::new();
        let mut reporter = ProgressReporter::new(RecordingView::default());

        let written = run_transfer(events, &mut sink, &mut reporter, SPEED_REFRESH)
            .await
            .unwrap();

        assert_eq!(written, 600);
        assert_eq!(sink.len(), 600);
        assert_eq!(reporter.received(), 600);
        assert_eq!(reporter.percent(), Some(60.0));
        assert_eq!(reporter.state(), ReporterState::Completed);
        assert!(reporter.view().finished);
    }

    #[tokio::test]
    async fn test_run_transfer_error_marks_failed() {
        let events = stream::iter(vec![
            Ok(StreamEvent::Response {
                content_length: Some(1000),
            }),
            data(100),
            Err(TubeError::HttpStatus(403)),
            data(100),
        ]);
        let mut sink: Vec<u8> = Vec::new();
        let mut reporter = ProgressReporter::new(RecordingView::default());

        let err = run_transfer(events, &mut sink, &mut reporter, SPEED_REFRESH)
            .await
            .unwrap_err();

        assert!(matches!(err, TubeError::HttpStatus(403)));
        assert_eq!(sink.len(), 100);
        assert_eq!(reporter.state(), ReporterState::Failed);
        assert!(reporter.view().abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_redraw_while_stream_stalls() {
        let events = stream::iter(vec![
            (Duration::ZERO, Ok(StreamEvent::Response { content_length: Some(1000) })),
            (Duration::ZERO, data(100)),
            (Duration::from_millis(2500), data(200)),
        ])
        .then(|(delay, event)| async move {
            tokio::time::sleep(delay).await;
            event
        });
        let events = Box::pin(events);
        let mut sink: Vec<u8> = Vec::new();
        let mut reporter = ProgressReporter::new(RecordingView::default());

        run_transfer(events, &mut sink, &mut reporter, SPEED_REFRESH)
            .await
            .unwrap();

        // start + first chunk + two ticks during the stall + second chunk
        let positions: Vec<u64> = reporter.view().updates.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![0, 100, 100, 100, 300]);
        assert!(reporter.view().updates[2..]
            .iter()
            .all(|(_, speed)| speed != "N/A"));
    }
}
