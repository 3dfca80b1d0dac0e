//! Delegation lifecycle controller
//!
//! Each cycle re-reads the validator's contracts and the current round,
//! classifies the contracts by derived state and acts on each bucket:
//!
//! - Created: generate (or reuse) a key and deposit it
//! - Deposited: terminate when the confirmation window has lapsed
//! - Active: terminate on breach or expiry
//!
//! Nothing is carried between cycles. Provisioning failures stop the
//! controller; everything else is logged and retried on the next cycle.
//! When the key tool's table cannot be read, contracts that depend on it
//! are deferred to the next cycle.

use crate::cadence::remaining;
use crate::error::{ControllerError, ControllerResult, ProvisioningError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use ward_keys::{KeyError, KeyProvisioningGateway};
use ward_ledger::{LedgerGateway, Signer};
use ward_policy::{verdict, Terminator};
use ward_types::{
    ContractId, ContractState, DelegationContract, ParticipationId, TerminationReason, ValidatorId,
};

/// Contracts partitioned by derived state
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub created: Vec<&'a DelegationContract>,
    pub deposited: Vec<&'a DelegationContract>,
    pub active: Vec<&'a DelegationContract>,
}

impl Buckets<'_> {
    pub fn len(&self) -> usize {
        self.created.len() + self.deposited.len() + self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition contracts by [`DelegationContract::state`]
pub fn classify(contracts: &[DelegationContract]) -> Buckets<'_> {
    let mut buckets = Buckets::default();
    for contract in contracts {
        match contract.state() {
            ContractState::Created => buckets.created.push(contract),
            ContractState::Deposited => buckets.deposited.push(contract),
            ContractState::Active => buckets.active.push(contract),
        }
    }
    buckets
}

/// What one cycle saw and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Round all decisions of the cycle were made against
    pub round: u64,
    pub created: usize,
    pub deposited: usize,
    pub active: usize,
    /// Contracts that received keys this cycle, generated or reused.
    /// A superset of `reused`.
    pub provisioned: Vec<ContractId>,
    /// Contracts whose keys already existed and were reused
    pub reused: Vec<ContractId>,
    pub terminated: Vec<(ContractId, TerminationReason)>,
    /// Contracts left alone because the key table could not be read
    pub deferred: Vec<ContractId>,
}

enum Provisioning {
    Generated,
    Reused,
    Deferred,
}

enum Enforcement {
    Retained,
    Terminated(TerminationReason),
    Deferred,
}

/// Reconciles the validator's delegation contracts with the key tool
pub struct DelegationLifecycleController {
    validator_id: ValidatorId,
    signer: Signer,
    ledger: Arc<dyn LedgerGateway>,
    keys: KeyProvisioningGateway,
    terminator: Terminator,
    period: Duration,
}

impl DelegationLifecycleController {
    pub fn new(
        validator_id: ValidatorId,
        signer: Signer,
        ledger: Arc<dyn LedgerGateway>,
        keys: KeyProvisioningGateway,
        period: Duration,
    ) -> Self {
        let terminator = Terminator::new(ledger.clone());
        Self {
            validator_id,
            signer,
            ledger,
            keys,
            terminator,
            period,
        }
    }

    pub fn validator_id(&self) -> ValidatorId {
        self.validator_id
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one reconciliation cycle
    pub async fn run_cycle(&self) -> ControllerResult<CycleReport> {
        let contracts = self.ledger.fetch_contracts(self.validator_id).await?;
        let round = self.ledger.current_round().await?;

        let buckets = classify(&contracts);
        tracing::info!(
            validator_id = %self.validator_id,
            round,
            created = buckets.created.len(),
            deposited = buckets.deposited.len(),
            active = buckets.active.len(),
            "Classified contracts"
        );

        let mut report = CycleReport {
            round,
            created: buckets.created.len(),
            deposited: buckets.deposited.len(),
            active: buckets.active.len(),
            ..Default::default()
        };

        for contract in &buckets.created {
            match self.provision(contract).await {
                Ok(Provisioning::Generated) => report.provisioned.push(contract.id),
                Ok(Provisioning::Reused) => {
                    report.reused.push(contract.id);
                    report.provisioned.push(contract.id);
                }
                Ok(Provisioning::Deferred) => report.deferred.push(contract.id),
                Err(source) => {
                    tracing::error!(
                        contract_id = %contract.id,
                        account = %contract.account,
                        error = %source,
                        "Provisioning failed"
                    );
                    return Err(ControllerError::Fatal {
                        contract_id: contract.id,
                        source,
                    });
                }
            }
        }

        for contract in buckets.deposited.iter().chain(buckets.active.iter()) {
            match self.enforce(round, contract).await {
                Enforcement::Retained => {}
                Enforcement::Terminated(reason) => report.terminated.push((contract.id, reason)),
                Enforcement::Deferred => report.deferred.push(contract.id),
            }
        }

        tracing::info!(
            round,
            provisioned = report.provisioned.len(),
            reused = report.reused.len(),
            terminated = report.terminated.len(),
            deferred = report.deferred.len(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Run cycles until a fatal error
    pub async fn run(&self) -> ControllerResult<u64> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run cycles until `shutdown` resolves or a fatal error occurs.
    ///
    /// Shutdown is only observed between cycles. Returns the number of
    /// cycles started.
    pub async fn run_until<F>(&self, shutdown: F) -> ControllerResult<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            let started = Instant::now();
            cycles += 1;

            match self.run_cycle().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, cycles, "Controller stopped");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Ledger state unknown, retrying next cycle");
                }
            }

            let sleep = remaining(self.period, started.elapsed());
            if !sleep.is_zero() {
                tracing::info!(seconds = sleep.as_secs(), "Going to sleep");
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(cycles, "Shutdown requested, controller stopped");
                    return Ok(cycles);
                }
                _ = tokio::time::sleep(sleep) => {
                    if !sleep.is_zero() {
                        tracing::info!("Waking up after sleeping {} s", sleep.as_secs());
                    }
                }
            }
        }
    }

    /// Make sure `contract` has a deposited key.
    ///
    /// A single key held for the account with the contract's window is
    /// reused, so a restart between generation and deposit does not leave a
    /// stray key. Any other key held for the account is deleted before a new
    /// one is generated: an account never holds two keys. Provisioning is
    /// deferred when the key table cannot be read or a stale key survives
    /// deletion.
    async fn provision(&self, contract: &DelegationContract) -> Result<Provisioning, ProvisioningError> {
        let held = match self.keys.keys_for_account(&contract.account).await {
            Ok(held) => held,
            Err(e) => {
                tracing::warn!(
                    contract_id = %contract.id,
                    account = %contract.account,
                    error = %e,
                    "Key state unknown, provisioning deferred"
                );
                return Ok(Provisioning::Deferred);
            }
        };

        if let [key] = held.as_slice() {
            if key.round_start == contract.round_start && key.round_end == contract.round_end {
                tracing::info!(
                    contract_id = %contract.id,
                    participation_id = %key.id,
                    "Reusing existing participation key"
                );
                self.deposit(contract, &key.id).await?;
                return Ok(Provisioning::Reused);
            }
        }

        for key in &held {
            let (deleted, output) = self.keys.delete(&key.id).await;
            if !deleted {
                tracing::warn!(
                    contract_id = %contract.id,
                    participation_id = %key.id,
                    output = %output.trim(),
                    "Stale participation key survived deletion, provisioning deferred"
                );
                return Ok(Provisioning::Deferred);
            }
            tracing::info!(
                contract_id = %contract.id,
                participation_id = %key.id,
                round_start = key.round_start,
                round_end = key.round_end,
                "Deleted stale participation key"
            );
        }

        let id = self
            .keys
            .generate(&contract.account, contract.round_start, contract.round_end)
            .await?;
        self.deposit(contract, &id).await?;
        Ok(Provisioning::Generated)
    }

    async fn deposit(&self, contract: &DelegationContract, id: &ParticipationId) -> Result<(), ProvisioningError> {
        let record = self.keys.details(id).await?;
        let material = record.key_material().map_err(KeyError::from)?;

        let confirmation = self
            .ledger
            .deposit_keys(
                contract.id,
                self.validator_id,
                &contract.account,
                &material,
                &self.signer,
            )
            .await?;

        tracing::info!(
            contract_id = %contract.id,
            participation_id = %id,
            round = confirmation.round,
            tx_id = %confirmation.tx_id,
            "Keys deposited"
        );
        Ok(())
    }

    /// Terminate `contract` if the policy says so
    async fn enforce(&self, round: u64, contract: &DelegationContract) -> Enforcement {
        let Some(reason) = verdict(round, contract) else {
            return Enforcement::Retained;
        };
        tracing::info!(
            contract_id = %contract.id,
            account = %contract.account,
            reason = %reason,
            round,
            "Contract must be terminated"
        );

        let terminated = match reason {
            // The contract disappears once terminated, so its key has to go first
            TerminationReason::UnconfirmedKeys | TerminationReason::Breach => {
                if !self.delete_key(contract).await {
                    tracing::warn!(contract_id = %contract.id, reason = %reason, "Termination deferred");
                    return Enforcement::Deferred;
                }
                self.terminate(contract, reason).await
            }
            // Expired contracts keep their key until the termination lands
            TerminationReason::Expiry => {
                let terminated = self.terminate(contract, reason).await;
                if terminated {
                    self.delete_key(contract).await;
                }
                terminated
            }
        };

        if terminated {
            Enforcement::Terminated(reason)
        } else {
            Enforcement::Retained
        }
    }

    async fn terminate(&self, contract: &DelegationContract, reason: TerminationReason) -> bool {
        self.terminator
            .terminate(
                &contract.account,
                contract.id,
                self.validator_id,
                &self.signer,
                reason,
            )
            .await
            .is_ok()
    }

    /// Best-effort key deletion: an absent key or a failed delete is logged.
    ///
    /// Returns false when the key table could not be read, leaving the key
    /// state unknown.
    async fn delete_key(&self, contract: &DelegationContract) -> bool {
        match self.keys.delete_for_account(&contract.account).await {
            Ok((true, _)) => true,
            Ok((false, output)) => {
                tracing::info!(contract_id = %contract.id, output = %output.trim(), "Key was not deleted");
                true
            }
            Err(KeyError::NotFound(_)) => {
                tracing::info!(contract_id = %contract.id, "No key to delete");
                true
            }
            Err(e) => {
                tracing::warn!(contract_id = %contract.id, error = %e, "Key state unknown, key not deleted");
                false
            }
        }
    }
}
