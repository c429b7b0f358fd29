//! Courier CLI library
//!
//! Argument parsing, configuration loading and the command implementations behind the
//! `courier` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
