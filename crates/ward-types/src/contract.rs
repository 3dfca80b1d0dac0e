//! Delegation contract types
//!
//! The contract's lifecycle state is never stored. It is derived from the two
//! on-chain flags every time the contract is read.

use crate::{Account, ContractId, ValidatorId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A delegation contract as read from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationContract {
    /// Contract application id
    pub id: ContractId,

    /// Validator the contract is bound to
    pub validator_id: ValidatorId,

    /// Delegator account
    pub account: Account,

    /// First round of the delegation window
    pub round_start: u64,

    /// Last round of the delegation window
    pub round_end: u64,

    /// Delegator acknowledged the deposited keys
    #[serde(default)]
    pub keys_confirmed: bool,

    /// Validator deposited participation keys
    #[serde(default)]
    pub part_keys_deposited: bool,

    /// Round at which the deposit was confirmed
    #[serde(default)]
    pub round_keys_deposited: Option<u64>,

    /// Number of times the delegator has breached an ongoing obligation
    #[serde(default)]
    pub breach_count: u32,

    /// Agreed terms
    #[serde(default)]
    pub terms: ContractTerms,
}

impl DelegationContract {
    /// Derive the lifecycle state from the on-chain flags
    pub fn state(&self) -> ContractState {
        if self.keys_confirmed {
            ContractState::Active
        } else if self.part_keys_deposited {
            ContractState::Deposited
        } else {
            ContractState::Created
        }
    }
}

/// Terms agreed between validator and delegator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// Rounds the delegator has to confirm deposited keys
    pub confirmation_window: u64,

    /// Breaches after which the contract is considered indefinitely breached
    /// (0 disables the check)
    pub max_breach_count: u32,
}

impl Default for ContractTerms {
    fn default() -> Self {
        Self {
            confirmation_window: 1_000,
            max_breach_count: 3,
        }
    }
}

/// Derived lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractState {
    /// Awaiting key generation and deposit
    Created,
    /// Keys deposited, awaiting delegator confirmation
    Deposited,
    /// Keys confirmed, contract in force
    Active,
}

/// Why a contract is terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Delegator did not confirm keys within the grace window
    UnconfirmedKeys,
    /// Delegation window has passed
    Expiry,
    /// Delegator indefinitely breached the terms
    Breach,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::UnconfirmedKeys => "unconfirmed_keys",
            TerminationReason::Expiry => "expiry",
            TerminationReason::Breach => "breach",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(part_keys_deposited: bool, keys_confirmed: bool) -> DelegationContract {
        DelegationContract {
            id: ContractId::new(1),
            validator_id: ValidatorId::new(2),
            account: Account::new("ACC"),
            round_start: 100,
            round_end: 200,
            keys_confirmed,
            part_keys_deposited,
            round_keys_deposited: None,
            breach_count: 0,
            terms: ContractTerms::default(),
        }
    }

    #[test]
    fn test_state_from_flags() {
        assert_eq!(contract(false, false).state(), ContractState::Created);
        assert_eq!(contract(true, false).state(), ContractState::Deposited);
        assert_eq!(contract(true, true).state(), ContractState::Active);
        // Confirmation wins regardless of the deposit flag
        assert_eq!(contract(false, true).state(), ContractState::Active);
    }

    #[test]
    fn test_reason_rendering() {
        assert_eq!(TerminationReason::UnconfirmedKeys.to_string(), "unconfirmed_keys");
        let json = serde_json::to_string(&TerminationReason::Expiry).unwrap();
        assert_eq!(json, "\"expiry\"");
    }

    #[test]
    fn test_contract_deserializes_with_defaults() {
        let json = r#"{
            "id": 5,
            "validator_id": 9,
            "account": "ADDR",
            "round_start": 10,
            "round_end": 20
        }"#;
        let contract: DelegationContract = serde_json::from_str(json).unwrap();
        assert_eq!(contract.state(), ContractState::Created);
        assert_eq!(contract.terms, ContractTerms::default());
        assert!(contract.round_keys_deposited.is_none());
    }
}
