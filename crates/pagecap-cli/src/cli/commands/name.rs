//! `pagecap name` – show the screenshot name derived from each URL.

use pagecap_core::url_model::{safe_name, NameRegistry};

/// Names are resolved as in one batch, so repeated names show their suffix.
pub fn run_name(urls: &[String]) {
    let mut registry = NameRegistry::new();
    for url in urls {
        let name = registry.claim(&safe_name(url), url);
        println!("{name}\t{url}");
    }
}
