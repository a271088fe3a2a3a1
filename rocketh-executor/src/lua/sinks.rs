//! Log sink routing script logs into `tracing`

use rocketh_core::domain::log::LogLevel;
use rocketh_lua::LogSink;

/// Sink that forwards `log.*` calls of deploy scripts to `tracing`
///
/// Events are emitted under the `rocketh::script` target so they can be
/// filtered separately from the executor's own logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "rocketh::script", "{}", message),
            LogLevel::Info => tracing::info!(target: "rocketh::script", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "rocketh::script", "{}", message),
            LogLevel::Error => tracing::error!(target: "rocketh::script", "{}", message),
        }
    }
}
