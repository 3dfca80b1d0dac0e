//! In-memory ledger implementation

use crate::gateway::{Confirmation, LedgerError, LedgerGateway, LedgerResult, Signer};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use ward_types::{
    Account, ContractId, ContractState, DelegationContract, KeyMaterial, TerminationReason,
    ValidatorId,
};

/// A termination the ledger accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationRecord {
    pub contract_id: ContractId,
    pub account: Account,
    pub reason: TerminationReason,
    pub round: u64,
}

/// In-memory ledger for development and testing
///
/// Only the validator manager may sign deposits and terminations. Terminated
/// contracts disappear from [`LedgerGateway::fetch_contracts`].
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    manager: String,
    round: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
    contracts: Arc<RwLock<BTreeMap<ContractId, DelegationContract>>>,
    deposits: Arc<RwLock<HashMap<ContractId, KeyMaterial>>>,
    terminations: Arc<RwLock<Vec<TerminationRecord>>>,
}

impl InMemoryLedger {
    /// Create an empty ledger whose transactions must be signed by `manager`
    pub fn new(manager: impl Into<String>) -> Self {
        Self {
            manager: manager.into(),
            round: Arc::new(AtomicU64::new(0)),
            available: Arc::new(AtomicBool::new(true)),
            contracts: Arc::new(RwLock::new(BTreeMap::new())),
            deposits: Arc::new(RwLock::new(HashMap::new())),
            terminations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start at the given round
    pub fn with_round(self, round: u64) -> Self {
        self.round.store(round, Ordering::SeqCst);
        self
    }

    pub fn manager(&self) -> &str {
        &self.manager
    }

    /// Create or replace a contract
    pub async fn insert(&self, contract: DelegationContract) {
        let mut contracts = self.contracts.write().await;
        contracts.insert(contract.id, contract);
    }

    pub async fn contract(&self, id: ContractId) -> Option<DelegationContract> {
        let contracts = self.contracts.read().await;
        contracts.get(&id).cloned()
    }

    pub fn set_round(&self, round: u64) {
        self.round.store(round, Ordering::SeqCst);
    }

    /// Move the ledger forward, returning the new round
    pub fn advance_round(&self, rounds: u64) -> u64 {
        self.round.fetch_add(rounds, Ordering::SeqCst) + rounds
    }

    /// Make every call fail with [`LedgerError::Unavailable`] until re-enabled
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delegator confirms the deposited keys
    pub async fn confirm_keys(&self, id: ContractId) -> bool {
        let mut contracts = self.contracts.write().await;
        match contracts.get_mut(&id) {
            Some(contract) if contract.part_keys_deposited => {
                contract.keys_confirmed = true;
                true
            }
            _ => false,
        }
    }

    /// Record one breach of an ongoing obligation, returning the new count
    pub async fn record_breach(&self, id: ContractId) -> Option<u32> {
        let mut contracts = self.contracts.write().await;
        contracts.get_mut(&id).map(|contract| {
            contract.breach_count += 1;
            contract.breach_count
        })
    }

    /// Keys deposited for a contract
    pub async fn deposit(&self, id: ContractId) -> Option<KeyMaterial> {
        let deposits = self.deposits.read().await;
        deposits.get(&id).cloned()
    }

    pub async fn terminations(&self) -> Vec<TerminationRecord> {
        self.terminations.read().await.clone()
    }

    fn ensure_available(&self) -> LedgerResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("in-memory ledger disabled".to_string()))
        }
    }

    fn ensure_manager(&self, signer: &Signer) -> LedgerResult<()> {
        if signer.address() == self.manager {
            Ok(())
        } else {
            Err(LedgerError::Rejected(format!(
                "signer {} is not the validator manager",
                signer.address()
            )))
        }
    }

    fn confirmation(&self) -> Confirmation {
        Confirmation {
            round: self.round.load(Ordering::SeqCst),
            tx_id: Uuid::new_v4().to_string(),
        }
    }
}

fn bound_contract<'a>(
    contracts: &'a mut BTreeMap<ContractId, DelegationContract>,
    contract_id: ContractId,
    validator_id: ValidatorId,
) -> LedgerResult<&'a mut DelegationContract> {
    match contracts.get_mut(&contract_id) {
        Some(contract) if contract.validator_id == validator_id => Ok(contract),
        _ => Err(LedgerError::NotFound(format!("{} for {}", contract_id, validator_id))),
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn fetch_contracts(&self, validator_id: ValidatorId) -> LedgerResult<Vec<DelegationContract>> {
        self.ensure_available()?;
        let contracts = self.contracts.read().await;
        Ok(contracts
            .values()
            .filter(|c| c.validator_id == validator_id)
            .cloned()
            .collect())
    }

    async fn current_round(&self) -> LedgerResult<u64> {
        self.ensure_available()?;
        Ok(self.round.load(Ordering::SeqCst))
    }

    async fn deposit_keys(
        &self,
        contract_id: ContractId,
        validator_id: ValidatorId,
        account: &Account,
        keys: &KeyMaterial,
        signer: &Signer,
    ) -> LedgerResult<Confirmation> {
        self.ensure_available()?;
        self.ensure_manager(signer)?;

        let mut contracts = self.contracts.write().await;
        let contract = bound_contract(&mut contracts, contract_id, validator_id)?;

        if &contract.account != account {
            return Err(LedgerError::Rejected(format!(
                "{} belongs to {}, not {}",
                contract_id, contract.account, account
            )));
        }
        if contract.state() != ContractState::Created {
            return Err(LedgerError::Rejected(format!(
                "{} is {:?}, keys can only be deposited once",
                contract_id,
                contract.state()
            )));
        }

        let confirmation = self.confirmation();
        contract.part_keys_deposited = true;
        contract.round_keys_deposited = Some(confirmation.round);
        drop(contracts);

        self.deposits.write().await.insert(contract_id, keys.clone());
        tracing::debug!(contract_id = %contract_id, round = confirmation.round, "Keys deposited");
        Ok(confirmation)
    }

    async fn terminate_contract(
        &self,
        contract_id: ContractId,
        validator_id: ValidatorId,
        account: &Account,
        reason: TerminationReason,
        signer: &Signer,
    ) -> LedgerResult<Confirmation> {
        self.ensure_available()?;
        self.ensure_manager(signer)?;

        let mut contracts = self.contracts.write().await;
        bound_contract(&mut contracts, contract_id, validator_id)?;
        contracts.remove(&contract_id);
        drop(contracts);

        let confirmation = self.confirmation();
        self.terminations.write().await.push(TerminationRecord {
            contract_id,
            account: account.clone(),
            reason,
            round: confirmation.round,
        });
        tracing::debug!(contract_id = %contract_id, reason = %reason, "Contract terminated");
        Ok(confirmation)
    }
}
