//! WARD Ledger - the validator's view of the delegation ledger
//!
//! The controller never talks to a chain client directly. It consumes the
//! [`LedgerGateway`] trait, which exposes the four reads and writes the
//! delegation lifecycle needs. [`InMemoryLedger`] implements it for tests,
//! dry runs and simulation, optionally seeded from a [`LedgerFixture`].

#![deny(unsafe_code)]

pub mod fixture;
pub mod gateway;
pub mod memory;

pub use fixture::{FixtureError, LedgerFixture};
pub use gateway::{Confirmation, LedgerError, LedgerGateway, LedgerResult, Signer};
pub use memory::{InMemoryLedger, TerminationRecord};
