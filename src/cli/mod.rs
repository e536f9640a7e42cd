//! Command line interface module
//!
//! This module provides the entry point for parsing command-line arguments and running the syncer.
//! It includes argument parsing, validation, and the runner that wires config, Docker client and scheduler.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
