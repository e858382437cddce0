//! Wrapper around `tracing_subscriber` for logging.
//!
//! Logs go to stderr at the `WARN` level, or `DEBUG` when verbose. `RUST_LOG`
//! overrides both. Hosts with their own subscriber should not call [`Logger::init`].
use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::LevelFilter, fmt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Configure logging process-wide. Only the first call has any effect.
    pub fn init(verbose: bool) {
        INITIALIZED.get_or_init(|| setup_logging(verbose));
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
        .init();
}
