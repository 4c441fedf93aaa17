//! CLI tool for inspecting consistent hash rings.
//!
//! Provides commands for:
//! - Resolving keys to nodes
//! - Inspecting membership and ownership
//! - Simulating membership changes and measuring key movement

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult, Report};
pub use config::{CliConfig, HashKind, RingFile, RingSettings};
