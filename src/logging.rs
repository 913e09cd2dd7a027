use tracing::error;

/// Sink for failures the asset store recovers from.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
}

/// Discards everything. Default logger of a fresh store.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn error(&self, _message: &str) {}
}

/// Forwards messages to `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        error!(error_message = %message, error_group = "asset_store");
    }
}
