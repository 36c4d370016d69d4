pub mod cmd;

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. `RUST_LOG` overrides the default
/// level, which is DEBUG for debug builds and INFO for release builds.
pub fn init_logging() {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let verbose = cfg!(debug_assertions);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!cfg!(windows))
        .with_target(false)
        .with_thread_ids(verbose)
        .with_thread_names(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        debug!("Logging initialized");
    }
}
