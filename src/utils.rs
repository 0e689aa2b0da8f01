use colored::Colorize;

use suppscore::record::present;

/// Truncate a string to max_len characters (not bytes), adding "..." if truncated.
/// Safe for non-ASCII content (emoji, CJK, etc).
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}

/// Check if terminal supports colors
pub fn use_color() -> bool {
    atty::is(atty::Stream::Stdout)
}

/// Score with one decimal, colored by band
pub fn format_score(score: f64, color: bool) -> String {
    let text = format!("{:4.1}", score);
    if !color {
        return text;
    }
    if score >= 7.0 {
        text.green().to_string()
    } else if score >= 4.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// Field value for display; sentinels dimmed
pub fn format_field(value: &str, max_len: usize, color: bool) -> String {
    match present(value) {
        Some(text) => truncate_str(text, max_len),
        None if color => value.dimmed().to_string(),
        None => value.to_string(),
    }
}

/// Status text colored by outcome
pub fn format_status(status: &str, color: bool) -> String {
    if !color {
        status.to_string()
    } else if status.starts_with("Failed") {
        status.red().to_string()
    } else if status.starts_with("Partial") {
        status.yellow().to_string()
    } else {
        status.green().to_string()
    }
}
