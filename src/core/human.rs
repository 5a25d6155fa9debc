//! Human-readable rendering of sizes, durations, counts and rates

const SIZE_SUFFIXES: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
const THRESHOLD: u64 = 1024;

/// Pick the binary magnitude for a byte count.
///
/// Equivalent to `floor(log(bytes) / log(1024))` clamped to the suffix table,
/// computed on integers so exact powers of 1024 land on the right unit. Zero
/// maps to the smallest unit.
fn magnitude(bytes: u64) -> (usize, u64) {
    let mut index = 0;
    let mut scale = 1u64;
    while index < SIZE_SUFFIXES.len() - 1 && bytes / scale >= THRESHOLD {
        scale *= THRESHOLD;
        index += 1;
    }
    (index, scale)
}

/// Format bytes as e.g. `"4.88 kB"`, always with two decimals.
///
/// `human_size(0)` renders `"0.00 B"`.
pub fn human_size(bytes: u64) -> String {
    let (index, scale) = magnitude(bytes);
    format!("{:.2} {}", bytes as f64 / scale as f64, SIZE_SUFFIXES[index])
}

/// Format seconds as `HH:MM:SS`, prefixing a single `-` for negative input.
pub fn human_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let magnitude = seconds.abs();

    let hours = (magnitude / 3600.0).floor() as u64;
    let minutes = ((magnitude / 60.0) % 60.0).floor() as u64;
    let secs = (magnitude % 60.0).floor() as u64;

    format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, secs)
}

/// Format a count with English thousands separators
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a transfer rate with three significant digits, e.g. `"1.23 MB/s"`
pub fn format_speed(bytes_per_second: f64) -> String {
    let rate = if bytes_per_second.is_finite() && bytes_per_second > 0.0 {
        bytes_per_second
    } else {
        0.0
    };

    let (index, scale) = magnitude(rate as u64);
    let value = rate / scale as f64;
    let decimals = if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    };

    format!("{:.*} {}/s", decimals, value, SIZE_SUFFIXES[index])
}

/// Format a bitrate given in kilobits per second
pub fn format_bitrate(kbps: u64) -> String {
    format!("{} kbps", kbps)
}
