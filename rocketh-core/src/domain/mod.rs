//! Core domain types
//!
//! These types are shared between the Lua layer (which builds them from
//! script tables) and the executor (which persists and schedules them).

pub mod artifact;
pub mod deployment;
pub mod log;
pub mod script;
