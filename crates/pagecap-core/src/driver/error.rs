//! Driver error type, kept concrete so callers can tell timeouts from script failures.

use std::time::Duration;

use chromiumoxide::error::CdpError;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A bounded driver operation (navigation, page visit) ran out of time.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    /// In-page script threw or could not be evaluated.
    #[error("script failed: {0}")]
    Script(String),
    /// Script returned a value of an unexpected shape.
    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),
    /// Browser process or CDP connection failure.
    #[error("browser: {0}")]
    Browser(String),
    /// Browser could not be configured (bad executable path, unknown device...).
    #[error("invalid browser config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        match &e {
            CdpError::JavascriptException(_) => DriverError::Script(e.to_string()),
            _ => DriverError::Browser(e.to_string()),
        }
    }
}
