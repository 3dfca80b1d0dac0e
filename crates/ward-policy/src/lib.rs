//! WARD Policy - when a delegation contract must end
//!
//! ## Key Components
//!
//! - [`bouncer`]: pure predicates over a contract and the current round
//! - [`Terminator`]: submits terminations through the ledger gateway
//!
//! The predicates never perform I/O, so every termination decision can be
//! tested without a ledger or a key tool.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod bouncer;
pub mod terminator;

pub use bouncer::{confirmation_deadline_elapsed, has_breached_terms, has_expired, verdict};
pub use terminator::Terminator;
