//! onionscope library
//!
//! This module exposes the cache, command, CLI and scrape modules for use in
//! the binary and in integration tests.

pub mod cache;
pub mod cli;
pub mod command;
pub mod scrape;
