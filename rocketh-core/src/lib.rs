//! Rocketh Core
//!
//! Core types shared by the Rocketh deployment tooling.
//!
//! This crate contains:
//! - Domain types: deployments, pending deployments, artifacts, script metadata
//! - Small helpers for the hex quantities used on the wire

pub mod domain;
pub mod hex;
