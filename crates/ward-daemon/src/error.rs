//! Error types for the WARD daemon

use thiserror::Error;
use ward_keys::KeyError;
use ward_ledger::{FixtureError, LedgerError};
use ward_types::ContractId;

/// Configuration could not be loaded or is unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Key generation or deposit failed for a newly created contract
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Key provisioning failed: {0}")]
    Key(#[from] KeyError),

    #[error("Key deposit failed: {0}")]
    Deposit(#[from] LedgerError),
}

/// Controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Unrecoverable, the controller stops
    #[error("Fatal error while provisioning {contract_id}: {source}")]
    Fatal {
        contract_id: ContractId,
        #[source]
        source: ProvisioningError,
    },

    /// Ledger state could not be read this cycle
    #[error("Ledger read failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl ControllerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ControllerError::Fatal { .. })
    }
}

/// Top-level daemon errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("Ledger fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
