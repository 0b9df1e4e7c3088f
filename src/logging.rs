// Tracing subscriber setup.
// RUST_LOG filtering with optional JSON output.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Defaults to `info` when RUST_LOG is unset.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
