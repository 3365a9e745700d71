//! Administrative command line for the staffio credential and directory
//! stores.
//!
//! - [`config`]: `staffio.toml` plus `STAFFIO__*` overrides
//! - [`services`]: Opens the PostgreSQL and directory backends
//! - [`commands`]: One function per subcommand

pub mod cli;
pub mod commands;
pub mod config;
pub mod observability;
pub mod output;
pub mod services;

pub use config::{AppConfig, LoggingConfig};
