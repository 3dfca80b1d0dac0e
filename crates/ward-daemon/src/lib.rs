//! WARD Daemon library
//!
//! This module provides the core components of the WARD daemon:
//! - Configuration loading and validation
//! - The delegation lifecycle controller and its cadence
//! - Daemon wiring and shutdown handling

pub mod cadence;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod telemetry;

pub use config::{Overrides, WardConfig};
pub use controller::{classify, Buckets, CycleReport, DelegationLifecycleController};
pub use daemon::Daemon;
pub use error::{ConfigError, ControllerError, DaemonError, DaemonResult, ProvisioningError};
