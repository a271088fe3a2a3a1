//! Core Rocketh modules for Lua scripts
//!
//! Modules are generic over small traits so each context can plug its own
//! backend:
//! - Executor: routes script logs into `tracing`
//! - CLI: no-op implementations, only used to generate stubs

pub mod log;

pub use log::{LogModule, LogSink};
