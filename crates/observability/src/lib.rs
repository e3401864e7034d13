//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide tracing/logging.
///
/// The output format comes from `PORTAL_LOG_FORMAT` (`json` or `text`).
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var("PORTAL_LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    tracing::init_with(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::LogFormat;
