//! Synchronisation core
//!
//! [`Task`]s group [`Mapping`]s between a source and a target [`Location`].
//! The [`Syncer`] executes a task mapping by mapping; the [`Scheduler`] runs
//! one-off tasks once and recurring tasks on their interval, one at a time.

pub mod engine;
pub mod scheduler;
pub mod task;

pub use engine::{RunCredentials, Syncer};
pub use scheduler::{PingPolicy, Scheduler};
pub use task::{Location, Mapping, RegistryKind, Task};
