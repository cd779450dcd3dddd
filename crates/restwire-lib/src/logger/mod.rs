use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, EnvFilter};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Environment variable that switches log output to JSON lines.
pub const LOG_FORMAT_ENV: &str = "RESTWIRE_LOG_FORMAT";

/// Build the level filter. `RUST_LOG` wins when set; otherwise DEBUG when
/// `debug` is true, INFO when not.
pub fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Initialize the tracing subscriber with timestamp, level, and structured fields.
/// Emits JSON lines when `RESTWIRE_LOG_FORMAT=json`.
///
/// A second call is a no-op.
pub fn init(debug: bool) {
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter(debug))
        .with_timer(fmt::time::SystemTime)
        .with_level(true)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Set the global verbose mode flag.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::SeqCst);
}

/// Check whether verbose mode is currently enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}
