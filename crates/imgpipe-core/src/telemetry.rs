//! Log output for the `imgpipe` binary.
//!
//! stdout belongs to the pipeline result, so every log line is written to
//! stderr. `RUST_LOG` wins over the level chosen on the command line.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr subscriber, plain text or JSON lines.
///
/// A second call leaves the first subscriber in place.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // Option<Layer> is a no-op layer when None.
    let (text, json_lines) = if json {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr).json();
        (None, Some(layer))
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(layer), None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json_lines)
        .try_init();
}
