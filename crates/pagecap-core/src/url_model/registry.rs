//! Per-run resolution of colliding screenshot names.

use std::collections::HashMap;

/// Hands out unique file stems for one capture run.
///
/// The first URL to claim a name keeps it; later claims of the same name get
/// `-2`, `-3`, ... appended so no screenshot overwrites another.
#[derive(Debug, Default)]
pub struct NameRegistry {
    /// Claimed stem -> URL that claimed it.
    claimed: HashMap<String, String>,
    /// Base name -> next numeric suffix to try.
    next_suffix: HashMap<String, u32>,
    collisions: usize,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stem for `url` derived from `base`, unique within this registry.
    pub fn claim(&mut self, base: &str, url: &str) -> String {
        if !self.claimed.contains_key(base) {
            self.claimed.insert(base.to_string(), url.to_string());
            return base.to_string();
        }

        let first_url = self.claimed.get(base).cloned().unwrap_or_default();
        let n = self.next_suffix.entry(base.to_string()).or_insert(2);
        let stem = loop {
            let candidate = format!("{base}-{n}");
            *n += 1;
            if !self.claimed.contains_key(&candidate) {
                break candidate;
            }
        };
        self.collisions += 1;
        tracing::warn!(
            url = %url,
            first_url = %first_url,
            name = %base,
            resolved = %stem,
            "screenshot name collision, using suffixed name"
        );
        self.claimed.insert(stem.clone(), url.to_string());
        stem
    }

    /// Number of claims that needed a suffix.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
