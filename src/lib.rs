//! Docker Image Syncer Library
//!
//! This file serves as the library root for the docker-image-syncer crate,
//! organizing and exposing the various modules that make up the application.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use logging::Logger;
pub use sync::{Scheduler, Syncer, Task};
