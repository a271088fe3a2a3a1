//! Logging module for deploy scripts
//!
//! Exposes `log.debug`, `log.info`, `log.warning` and `log.error` to scripts.
//! Like `print`, each function takes any number of values and joins them
//! with spaces. Where the messages end up is decided by the [`LogSink`] the
//! module is built with.

use crate::module::RockethModule;
use mlua::prelude::*;
use rocketh_core::domain::log::LogLevel;
use std::sync::{Arc, Mutex};

/// Destination of script log messages
pub trait LogSink: Send + Sync {
    /// Write a log message
    ///
    /// # Arguments
    /// * `level` - The log level (Debug, Info, Warning, Error)
    /// * `message` - The log message content
    fn write(&mut self, level: LogLevel, message: &str);
}

/// Logging module, generic over its sink
pub struct LogModule<S: LogSink> {
    sink: Arc<Mutex<S>>,
}

impl<S: LogSink> LogModule<S> {
    /// Creates a new LogModule with the provided sink
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

impl<S: LogSink + 'static> RockethModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log_table = lua.create_table()?;

        let levels = [
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warning", LogLevel::Warning),
            ("error", LogLevel::Error),
        ];

        for (name, level) in levels {
            let sink = self.sink.clone();
            log_table.set(
                name,
                lua.create_function(move |_, values: LuaVariadic<LuaValue>| {
                    let message = join_values(&values)?;
                    sink.lock()
                        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock sink: {}", e)))?
                        .write(level, &message);
                    Ok(())
                })?,
            )?;
        }

        lua.globals().set(self.id(), log_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Logging module for deploy scripts
---@class log
log = {}

---Log a debug message
---@param ... any Values to log, joined with spaces
function log.debug(...) end

---Log an info message
---@param ... any Values to log, joined with spaces
function log.info(...) end

---Log a warning message
---@param ... any Values to log, joined with spaces
function log.warning(...) end

---Log an error message
---@param ... any Values to log, joined with spaces
function log.error(...) end
"#
        .to_string()
    }
}

/// Formats values the way `print` would, honoring `__tostring`
fn join_values(values: &[LuaValue]) -> LuaResult<String> {
    let parts = values
        .iter()
        .map(|v| v.to_string())
        .collect::<LuaResult<Vec<_>>>()?;
    Ok(parts.join(" "))
}
