//! URL list input: one URL per line, `#` comments and blank lines ignored.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

const COMMENT_MARKER: char = '#';

/// Extracts URLs from the text of a list file, preserving order.
///
/// A line is kept when it is non-empty after trimming and the line as written
/// does not start with `#`, so an indented `#` is kept. Kept lines are
/// trimmed. No URL validation is done here.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the URL list at `path`, or returns `[default_url]` when the file does not exist.
pub fn read_urls(path: &Path, default_url: &str) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let urls = parse_url_list(&text);
            tracing::debug!(path = %path.display(), count = urls.len(), "read URL list");
            Ok(urls)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(
                path = %path.display(),
                "URL list not found, using default URL {}",
                default_url
            );
            Ok(vec![default_url.to_string()])
        }
        Err(e) => Err(e).with_context(|| format!("reading URL list {}", path.display())),
    }
}
