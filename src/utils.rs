//! Utility functions for text shaping, HTML escaping, dates, and the file system.
//!
//! This module provides helper functions used throughout the application:
//! - Slugs and file-name checks for images, pages, and templates
//! - The single HTML escaping step applied to every user-sourced string
//! - Excerpts and date formatting for rendered cards
//! - Directory validation before a command starts writing

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{NewsdeskError, Result};

/// Length of the content preview shown on cards.
pub const EXCERPT_CHARS: usize = 150;

/// Marker rendered when no known timestamp shape parses.
pub const DATE_UNAVAILABLE: &str = "Date N/A";

/// Current UTC time as an RFC 3339 string with microsecond precision.
///
/// All store timestamps use this one shape so lexical order equals
/// chronological order.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary at or below `max` bytes,
/// with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Convert a topic name to a file-name friendly slug.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Climate Action"), "climate_action");
/// assert_eq!(slugify("AI News!"), "ai_news");
/// ```
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Check that `name` is a bare file name with no directory components.
pub fn validate_file_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        Err(NewsdeskError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Escape text for insertion into HTML element content or a quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// First [`EXCERPT_CHARS`] characters of `content`, with `"..."` appended
/// only when something was cut off.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Format a source timestamp as `"May 20, 2025"`.
///
/// Accepts RFC 3339 (with or without fractional seconds and offsets), naive
/// `YYYY-MM-DDTHH:MM:SS[.f]`, space-separated date-times, and bare dates.
/// Anything else yields [`DATE_UNAVAILABLE`].
pub fn format_date(raw: &str) -> String {
    const OUT: &str = "%B %d, %Y";
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(OUT).to_string();
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.format(OUT).to_string();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format(OUT).to_string();
    }
    DATE_UNAVAILABLE.to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| NewsdeskError::io(path, e))?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(NewsdeskError::io(path, e)),
    }
}
