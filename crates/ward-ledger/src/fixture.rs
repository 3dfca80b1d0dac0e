//! JSON fixtures for seeding an [`InMemoryLedger`]

use crate::memory::InMemoryLedger;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use ward_types::DelegationContract;

/// Fixture loading errors
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot of a ledger: current round, validator manager and live contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFixture {
    #[serde(default)]
    pub round: u64,

    pub manager: String,

    #[serde(default)]
    pub contracts: Vec<DelegationContract>,
}

impl LedgerFixture {
    /// Read a fixture from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build a ledger holding the fixture's state
    pub async fn into_ledger(self) -> InMemoryLedger {
        let ledger = InMemoryLedger::new(self.manager).with_round(self.round);
        for contract in self.contracts {
            ledger.insert(contract).await;
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerGateway;
    use std::io::Write;
    use ward_types::{ContractState, ValidatorId};

    #[tokio::test]
    async fn test_load_fixture_into_ledger() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "round": 120,
                "manager": "MANAGER",
                "contracts": [
                    {{"id": 1, "validator_id": 7, "account": "A", "round_start": 100, "round_end": 200}},
                    {{"id": 2, "validator_id": 7, "account": "B", "round_start": 100, "round_end": 200,
                      "part_keys_deposited": true, "round_keys_deposited": 110}}
                ]
            }}"#
        )
        .unwrap();

        let ledger = LedgerFixture::load(file.path()).unwrap().into_ledger().await;
        assert_eq!(ledger.current_round().await.unwrap(), 120);
        assert_eq!(ledger.manager(), "MANAGER");

        let contracts = ledger.fetch_contracts(ValidatorId::new(7)).await.unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[1].state(), ContractState::Deposited);
    }

    #[test]
    fn test_invalid_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"round\": 1}}").unwrap();
        assert!(matches!(LedgerFixture::load(file.path()), Err(FixtureError::Json(_))));
    }
}
