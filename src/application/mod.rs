//! Application Layer
//!
//! Use cases that sequence the domain ports.

mod rolling_restart;

pub use rolling_restart::{DeployError, DeployPhase, RollingRestartService, RunReport};
