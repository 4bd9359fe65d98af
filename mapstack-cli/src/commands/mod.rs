//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`scan`] - One refresh cycle over a manifest directory

pub mod config;
pub mod scan;
