//! Logging setup for the `codevet` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Levels come from the `CODEVET_LOG` environment variable
//! using `EnvFilter` directives, for example:
//!
//! ```text
//! CODEVET_LOG=codevet=debug
//! CODEVET_LOG=codevet::llm=debug,codevet::core::cache=info
//! ```

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "CODEVET_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

static INIT: Once = Once::new();

/// Filter from `CODEVET_LOG`, or `warn` when unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber, writing to stderr so that JSON on stdout
/// stays machine-readable. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(env_filter())
            .init();
    });
}
