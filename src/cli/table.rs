//! Plain text tables for the terminal

use colored::Colorize;

/// Gap between columns
const GAP: &str = "  ";

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

/// Render `key: value` rows with aligned values and bold keys
pub fn render_key_values(rows: &[(&str, String)]) -> String {
    let width = rows
        .iter()
        .map(|(key, _)| key.chars().count() + 1)
        .max()
        .unwrap_or(0);

    rows.iter()
        .map(|(key, value)| {
            // Pad before styling so escape codes do not count as width
            let label = pad(&format!("{}:", key), width);
            format!("{}{}{}", label.bold(), GAP, value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a table with an underlined header row
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w).underline().to_string())
        .collect::<Vec<_>>()
        .join(GAP);
    lines.push(header);

    for row in rows {
        let line = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(row.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect::<Vec<_>>()
            .join(GAP);
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}
