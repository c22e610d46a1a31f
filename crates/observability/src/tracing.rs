//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with `default_directive` as the filter when `RUST_LOG`
/// is unset.
///
/// Emits JSON logs with timestamps; idempotent (a second call is a no-op).
pub fn init_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_noop() {
        init_with_default("debug");
        init_with_default("info");
    }
}
