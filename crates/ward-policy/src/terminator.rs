//! Termination side effects

use std::fmt;
use std::sync::Arc;
use ward_ledger::{Confirmation, LedgerGateway, LedgerResult, Signer};
use ward_types::{Account, ContractId, TerminationReason, ValidatorId};

/// Submits contract terminations to the ledger.
///
/// Never touches key material; deleting a terminated contract's key is the
/// caller's job.
#[derive(Clone)]
pub struct Terminator {
    ledger: Arc<dyn LedgerGateway>,
}

impl fmt::Debug for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminator").finish_non_exhaustive()
    }
}

impl Terminator {
    pub fn new(ledger: Arc<dyn LedgerGateway>) -> Self {
        Self { ledger }
    }

    /// Terminate `contract_id` for `reason`, signed by the validator manager
    pub async fn terminate(
        &self,
        account: &Account,
        contract_id: ContractId,
        validator_id: ValidatorId,
        signer: &Signer,
        reason: TerminationReason,
    ) -> LedgerResult<Confirmation> {
        tracing::info!(
            contract_id = %contract_id,
            account = %account,
            reason = %reason,
            "Terminating contract"
        );

        match self
            .ledger
            .terminate_contract(contract_id, validator_id, account, reason, signer)
            .await
        {
            Ok(confirmation) => {
                tracing::info!(
                    contract_id = %contract_id,
                    round = confirmation.round,
                    tx_id = %confirmation.tx_id,
                    "Contract terminated"
                );
                Ok(confirmation)
            }
            Err(e) => {
                tracing::warn!(contract_id = %contract_id, error = %e, "Termination failed");
                Err(e)
            }
        }
    }
}
