//! Process-wide log setup for stockwise binaries and tests.

/// Install the JSON subscriber.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filter, format).
pub mod tracing;
