//! Command line front end for ringkv.
//!
//! Provides commands for:
//! - Running a node and joining it to a cluster
//! - Locating the owner and replicas of a key offline

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
