//! Command-line interface and daemon entry point
//!
//! This crate provides the `calsign` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod source;

pub use cli::Cli;
pub use config::SignConfig;
pub use error::{ClientError, ClientResult};
