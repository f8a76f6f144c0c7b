//! App layer: wires ports and the core into a runnable orchestrator.
//!
//! - **RunnerBuilder**: wiring with fail-fast checks
//! - **AdapterRegistry**: engine identifier -> adapter
//! - **RunnerConfig**: limits and defaults
//! - **Runner**: the orchestration loop

pub mod builder;
pub mod config;
pub mod registry;
pub mod runner;

pub use self::builder::{BuildError, RunnerBuilder};
pub use self::config::RunnerConfig;
pub use self::registry::{AdapterRegistry, RegistryError};
pub use self::runner::{RunReport, Runner, RunnerError};
