//! Filesystem-safe name sanitization.

/// Characters kept verbatim in a safe name.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'
}

/// Replaces every run of characters outside `[A-Za-z0-9._-]` with a single `-`,
/// then trims leading/trailing `-`.
///
/// A literal `-` next to a replaced run is kept, so `"a-/b"` becomes `"a--b"`.
pub fn collapse_unsafe_runs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;

    for c in raw.chars() {
        if is_safe(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }

    out.trim_matches('-').to_string()
}
