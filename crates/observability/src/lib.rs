//! Process-wide tracing setup shared by the binaries.

/// Install the JSON tracing subscriber.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

pub mod tracing;
