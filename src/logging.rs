use std::env;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `media_ingest=debug`.
pub const LOG_FILTER_ENV: &str = "MEDIA_INGEST_LOG";

/// Install the stderr tracing subscriber.
///
/// `MEDIA_INGEST_LOG` wins when set; otherwise the level is `info`, or
/// `debug` with `verbose`.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
