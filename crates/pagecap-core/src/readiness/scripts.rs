//! In-page JavaScript used by the readiness routine.
//!
//! Function scripts are invoked through [`call`], which appends JSON-encoded
//! arguments, so no value is ever spliced into script source by hand.

use serde_json::Value;

/// Renders `(function)(arg, ...)` with every argument JSON-encoded.
pub fn call(function: &str, args: &[Value]) -> String {
    let args: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("({function})({})", args.join(", "))
}

/// Init script: keep every current and future `<video>` muted, inline and
/// eagerly loading, and start playback once its first frame is available.
pub const VIDEO_PATCH_INIT: &str = r#"
(() => {
  const patched = new WeakSet();
  const patch = (v) => {
    if (patched.has(v)) return;
    patched.add(v);
    try {
      v.muted = true;
      v.playsInline = true;
      v.preload = 'auto';
      v.addEventListener('loadeddata', () => { v.play().catch(() => {}); });
    } catch (e) {}
  };
  const patchAll = () => document.querySelectorAll('video').forEach(patch);
  const start = () => {
    patchAll();
    new MutationObserver(patchAll)
      .observe(document.documentElement, { childList: true, subtree: true });
  };
  if (document.documentElement) start();
  else document.addEventListener('DOMContentLoaded', start, { once: true });
})();
"#;

/// `(step, pause, maxSteps) -> steps`: scroll to the bottom in steps, then back to top.
pub const AUTO_SCROLL: &str = r#"async (step, pause, maxSteps) => {
  const sleep = (ms) => new Promise((r) => setTimeout(r, ms));
  const maxH = () => Math.max(
    document.body ? document.body.scrollHeight : 0,
    document.documentElement.scrollHeight
  );
  let total = 0;
  let steps = 0;
  while (total < maxH() && steps < maxSteps) {
    window.scrollBy(0, step);
    total += step;
    steps += 1;
    await sleep(pause);
  }
  await sleep(pause);
  window.scrollTo(0, Math.max(0, total - step));
  await sleep(pause);
  window.scrollTo(0, 0);
  return steps;
}"#;

/// `(srcAttrs, srcsetAttrs) -> {images, src, srcset}`: copy lazy attributes
/// into empty `src`/`srcset` and nudge decoding.
pub const PROMOTE_LAZY_IMAGES: &str = r#"(srcAttrs, srcsetAttrs) => {
  const promote = (el, target, candidates) => {
    if (el.getAttribute(target)) return 0;
    for (const a of candidates) {
      const v = el.getAttribute(a);
      if (v) { el.setAttribute(target, v); return 1; }
    }
    return 0;
  };
  const imgs = Array.from(document.images);
  let src = 0;
  let srcset = 0;
  for (const img of imgs) {
    src += promote(img, 'src', srcAttrs);
    srcset += promote(img, 'srcset', srcsetAttrs);
    try { if (img.decode) img.decode().catch(() => {}); } catch (e) {}
  }
  return { images: imgs.length, src, srcset };
}"#;

/// `(attrs) -> {videos, src}`: lazy `src` promotion for `<video>` and child
/// `<source>` elements; forces `preload = "auto"`.
pub const PROMOTE_LAZY_VIDEOS: &str = r#"(attrs) => {
  const promote = (el) => {
    if (el.getAttribute('src')) return 0;
    for (const a of attrs) {
      const v = el.getAttribute(a);
      if (v) { el.setAttribute('src', v); return 1; }
    }
    return 0;
  };
  const vids = Array.from(document.querySelectorAll('video'));
  let src = 0;
  for (const v of vids) {
    src += promote(v);
    for (const s of Array.from(v.querySelectorAll('source'))) src += promote(s);
    try { v.preload = 'auto'; } catch (e) {}
  }
  return { videos: vids.length, src };
}"#;

pub const VIDEO_COUNT: &str = "document.querySelectorAll('video').length";

/// `(index) -> {hasSource, readyState} | null`: mute, inline, no loop.
pub const VIDEO_PREPARE: &str = r#"(index) => {
  const v = document.querySelectorAll('video')[index];
  if (!v) return null;
  v.muted = true;
  v.playsInline = true;
  v.loop = false;
  return {
    hasSource: !!(v.src || v.querySelector('source')),
    readyState: v.readyState,
  };
}"#;

/// `(index) -> {readyState, duration, currentTime} | null`; `duration` is null
/// unless finite and positive.
pub const VIDEO_STATE: &str = r#"(index) => {
  const v = document.querySelectorAll('video')[index];
  if (!v) return null;
  const d = v.duration;
  return {
    readyState: v.readyState,
    duration: Number.isFinite(d) && d > 0 ? d : null,
    currentTime: Number.isFinite(v.currentTime) ? v.currentTime : 0,
  };
}"#;

/// `(index, timeoutMs) -> "started" | "failed" | "pending"`.
pub const VIDEO_PLAY: &str = r#"async (index, timeoutMs) => {
  const v = document.querySelectorAll('video')[index];
  if (!v) return 'failed';
  const pending = new Promise((r) => setTimeout(() => r('pending'), timeoutMs));
  const play = (async () => {
    try { await v.play(); return 'started'; } catch (e) { return 'failed'; }
  })();
  return Promise.race([play, pending]);
}"#;

/// `(index, callbackTimeoutMs, fallbackMs) -> bool`: wait for a decoded frame;
/// true when `requestVideoFrameCallback` was available.
pub const VIDEO_FRAME: &str = r#"async (index, callbackTimeoutMs, fallbackMs) => {
  const sleep = (ms) => new Promise((r) => setTimeout(r, ms));
  const v = document.querySelectorAll('video')[index];
  if (!v) return false;
  if ('requestVideoFrameCallback' in v) {
    await Promise.race([
      new Promise((r) => v.requestVideoFrameCallback(() => r())),
      sleep(callbackTimeoutMs),
    ]);
    return true;
  }
  await sleep(fallbackMs);
  return false;
}"#;

/// True when there are no images or every image is complete with a real width.
pub const IMAGES_READY: &str = r#"Array.from(document.images).every(
  (img) => img.complete && Number(img.naturalWidth) > 0
)"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_encodes_arguments_as_json() {
        assert_eq!(
            call("(a, b) => a", &[json!(1000), json!(["data-src", "x\"y"])]),
            r#"((a, b) => a)(1000, ["data-src","x\"y"])"#
        );
    }

    #[test]
    fn call_without_arguments() {
        assert_eq!(call("() => 1", &[]), "(() => 1)()");
    }
}
