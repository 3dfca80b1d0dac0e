//! WARD Keys - participation key provisioning
//!
//! The node's key tool (`goal account ...`, optionally behind `algokit`) is
//! the only source of truth for participation keys. This crate drives it:
//!
//! - [`command`]: the process boundary, behind the [`CommandRunner`] trait
//! - [`grammar`]: every assumption about the tool's text output
//! - [`parser`]: list + info output into a [`KeyTable`]
//! - [`gateway`]: generate, look up and delete keys

#![deny(unsafe_code)]

pub mod command;
pub mod error;
pub mod gateway;
pub mod grammar;
pub mod parser;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use command::{CommandOutput, CommandRunner, ProcessCommandRunner, ToolFrontEnd, ToolInvocation};
pub use error::{CommandError, KeyError, ParseFormatError, Result};
pub use gateway::KeyProvisioningGateway;
pub use grammar::{KeyField, KeyInfoGrammar, GOAL_V1};
pub use parser::{KeyRecordParser, KeyTable};
