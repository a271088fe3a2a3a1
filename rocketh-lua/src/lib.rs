//! Rocketh Lua Infrastructure
//!
//! This crate provides the Lua side of deploy scripts.
//! It includes:
//! - Module trait and registry for Lua modules
//! - The restricted sandbox scripts are evaluated in, with the `import` and
//!   `deploy_script` helpers
//! - Core module implementations (log)
//! - Script parsing into metadata and executable definitions
//! - Stub generation for local development

pub mod definition;
pub mod module;
pub mod modules;
pub mod parser;
pub mod sandbox;

pub use definition::{ScriptDefinition, parse_script_definition};
pub use module::{ModuleRegistry, RockethModule};
pub use modules::{LogModule, LogSink};
pub use parser::parse_script_metadata;
pub use sandbox::{core_stubs, create_sandbox};

pub use rocketh_core::domain::script::ScriptMetadata;
