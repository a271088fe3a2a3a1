//! Lua side of the executor
//!
//! Bridges the environment into the script sandbox: reading the shared
//! context, building the `env` table, and routing script logs.

pub mod context;
pub mod environment;
pub mod sinks;

pub use context::provided_context;
pub use environment::create_env_table;
pub use sinks::TracingLogSink;

use mlua::{Lua, LuaSerdeExt, SerializeOptions, Value};
use serde::Serialize;

/// Converts a Rust value to Lua, mapping `None` and JSON `null` to `nil`
pub(crate) fn to_lua<T: Serialize + ?Sized>(lua: &Lua, value: &T) -> mlua::Result<Value> {
    lua.to_value_with(
        value,
        SerializeOptions::new()
            .serialize_none_to_null(false)
            .serialize_unit_to_null(false),
    )
}
