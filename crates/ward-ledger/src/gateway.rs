//! Ledger gateway trait definitions

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use ward_types::{Account, ContractId, DelegationContract, KeyMaterial, TerminationReason, ValidatorId};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Ledger could not be reached
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Transaction was rejected or not confirmed
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Contract does not exist (or is not bound to the validator)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Confirmation of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Round in which the transaction was confirmed
    pub round: u64,

    /// Transaction id
    pub tx_id: String,
}

/// Credentials used to sign validator transactions
#[derive(Clone)]
pub struct Signer {
    address: String,
    secret: String,
}

impl Signer {
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Secret material for the chain client that signs transactions
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Reads and writes the delegation lifecycle needs from the ledger
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// All live delegation contracts bound to a validator
    async fn fetch_contracts(&self, validator_id: ValidatorId) -> LedgerResult<Vec<DelegationContract>>;

    /// Current ledger round
    async fn current_round(&self) -> LedgerResult<u64>;

    /// Submit participation keys for a contract
    async fn deposit_keys(
        &self,
        contract_id: ContractId,
        validator_id: ValidatorId,
        account: &Account,
        keys: &KeyMaterial,
        signer: &Signer,
    ) -> LedgerResult<Confirmation>;

    /// End a contract on behalf of the validator
    async fn terminate_contract(
        &self,
        contract_id: ContractId,
        validator_id: ValidatorId,
        account: &Account,
        reason: TerminationReason,
        signer: &Signer,
    ) -> LedgerResult<Confirmation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_debug_redacts_secret() {
        let signer = Signer::new("MANAGER", "word word word");
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains("MANAGER"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("word word"));
        assert_eq!(signer.secret(), "word word word");
    }
}
