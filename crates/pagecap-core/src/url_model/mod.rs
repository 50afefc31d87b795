//! URL modeling and screenshot filename derivation.
//!
//! Derives a filesystem-safe name from a URL's host and path, and resolves
//! names that collide within one run.

mod registry;
mod sanitize;

pub use registry::NameRegistry;
pub use sanitize::collapse_unsafe_runs;

/// Used when host and path are both empty.
const ROOT_NAME: &str = "root";
/// Used when sanitizing leaves nothing.
const FALLBACK_NAME: &str = "page";

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Authority and path of `url`, sliced from the text as written.
///
/// Query string and fragment are dropped. Nothing is normalized: host case,
/// port, percent escapes and `..` segments are kept. Input without `//` after
/// the scheme has no authority, so all of it is path.
fn host_and_path(url: &str) -> (&str, &str) {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let url = &url[..end];
    let after_scheme = match url.split_once(':') {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => url,
    };
    match after_scheme.strip_prefix("//") {
        Some(rest) => rest.split_at(rest.find('/').unwrap_or(rest.len())),
        None => ("", after_scheme),
    }
}

/// Derives a filesystem-safe name for a URL's screenshot.
///
/// Concatenates host and path, strips surrounding `/`, replaces runs of
/// characters outside `[A-Za-z0-9._-]` with `-`. Never empty, never starts or
/// ends with `-`. URLs differing only in query string map to the same name.
///
/// # Examples
///
/// - `safe_name("https://a.com/x?y=1")` → `"a.com-x"`
/// - `safe_name("https://www.example.com/")` → `"www.example.com"`
pub fn safe_name(url: &str) -> String {
    let (host, path) = host_and_path(url);
    let joined = format!("{host}{path}");
    let mut raw = joined.trim_matches('/');
    if raw.is_empty() {
        raw = if host.is_empty() { ROOT_NAME } else { host };
    }

    let name = collapse_unsafe_runs(raw);
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}
