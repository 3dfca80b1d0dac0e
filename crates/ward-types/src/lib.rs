//! WARD Types - Core types for validator-side delegation management
//!
//! WARD runs next to a validator node. It provisions participation keys for
//! delegator accounts, deposits them on the ledger, and terminates delegation
//! contracts whose terms are no longer met.
//!
//! ## Key Concepts
//!
//! - **DelegationContract**: On-chain record binding a delegator to a validator
//! - **ContractState**: Lifecycle state derived from the contract's flags
//! - **ParticipationKeyRecord**: One row of the key tool's key table
//! - **KeyMaterial**: Decoded key blobs ready for a deposit transaction
//! - **TerminationReason**: Why the validator ended a contract

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod contract;
pub mod ids;
pub mod key;

pub use contract::{ContractState, ContractTerms, DelegationContract, TerminationReason};
pub use ids::{Account, ContractId, ParticipationId, ValidatorId};
pub use key::{key_dilution, KeyEncodingError, KeyMaterial, ParticipationKeyRecord};
