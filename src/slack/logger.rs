//! Per-client log sink.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{Level, debug, error, info, trace, warn};

/// Receives the clients' log lines. Messages never contain the API token or
/// a webhook secret.
pub trait ClientLogger: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Forwards to the `tracing` subscriber installed by the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => error!("{}", message),
            Level::WARN => warn!("{}", message),
            Level::INFO => info!("{}", message),
            Level::DEBUG => debug!("{}", message),
            _ => trace!("{}", message),
        }
    }
}

/// Hand `message` to `logger`, discarding any panic raised by it.
pub(crate) fn emit(logger: &dyn ClientLogger, level: Level, message: &str) {
    let _ = catch_unwind(AssertUnwindSafe(|| logger.log(level, message)));
}
