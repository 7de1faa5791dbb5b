//! Tracing/logging setup shared by every process embedding the erpkit modules.
//!
//! Domain crates only emit `tracing` events; installing a subscriber is the
//! embedding process's job, done once through [`init`].

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
