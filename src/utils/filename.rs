//! Safe filename generation

use regex::Regex;
use std::sync::LazyLock;

/// Longest file name most filesystems accept, in bytes
pub const MAX_FILENAME_BYTES: usize = 255;

static ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/?<>\\:*|"]"#).expect("valid illegal-char pattern"));
static CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f\x80-\x9f]").expect("valid control-char pattern"));
static RESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.+$").expect("valid reserved pattern"));
static WINDOWS_RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$")
        .expect("valid device-name pattern")
});

/// Make `name` safe to use as a file name.
///
/// Illegal and control characters become `replacement`, as do names made of
/// dots only and Windows device names. Trailing dots and spaces are dropped and
/// the result is cut to [`MAX_FILENAME_BYTES`] on a char boundary. The result
/// may be empty.
pub fn sanitize(name: &str, replacement: &str) -> String {
    let clean = sanitize_once(name, replacement);
    if replacement.is_empty() {
        clean
    } else {
        // The replacement itself may be illegal
        sanitize_once(&clean, "")
    }
}

fn sanitize_once(name: &str, replacement: &str) -> String {
    let name = ILLEGAL.replace_all(name, replacement);
    let name = CONTROL.replace_all(&name, replacement);
    let name = if RESERVED.is_match(&name) || WINDOWS_RESERVED.is_match(&name) {
        replacement.to_string()
    } else {
        name.into_owned()
    };
    let name = name.trim_end_matches(['.', ' ']);
    truncate_bytes(name, MAX_FILENAME_BYTES).to_string()
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
