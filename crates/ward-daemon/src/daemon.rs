//! Daemon setup and lifecycle management

use crate::config::{LedgerKind, WardConfig};
use crate::controller::{CycleReport, DelegationLifecycleController};
use crate::error::DaemonResult;
use std::sync::Arc;
use ward_keys::{KeyProvisioningGateway, ProcessCommandRunner};
use ward_ledger::{InMemoryLedger, LedgerFixture, LedgerGateway};

/// WARD daemon: one controller wired to its ledger and key tool
pub struct Daemon {
    config: WardConfig,
    controller: DelegationLifecycleController,
}

impl Daemon {
    /// Validate the configuration and build the controller from it
    pub async fn new(config: WardConfig) -> DaemonResult<Self> {
        config.validate()?;

        let ledger = build_ledger(&config).await?;
        let keys = KeyProvisioningGateway::new(Arc::new(ProcessCommandRunner), config.key_tool.front_end);

        Ok(Self::with_parts(config, ledger, keys))
    }

    /// Build a daemon around an existing ledger and key gateway
    pub fn with_parts(config: WardConfig, ledger: Arc<dyn LedgerGateway>, keys: KeyProvisioningGateway) -> Self {
        let controller = DelegationLifecycleController::new(
            config.validator.validator_id(),
            config.validator.signer(),
            ledger,
            keys,
            config.scheduler.poll_period(),
        );
        Self { config, controller }
    }

    pub fn config(&self) -> &WardConfig {
        &self.config
    }

    pub fn controller(&self) -> &DelegationLifecycleController {
        &self.controller
    }

    /// Run a single cycle
    pub async fn run_once(&self) -> DaemonResult<CycleReport> {
        Ok(self.controller.run_cycle().await?)
    }

    /// Run until SIGINT/SIGTERM or a fatal controller error
    pub async fn run(self) -> DaemonResult<()> {
        tracing::info!(
            validator_id = %self.controller.validator_id(),
            front_end = ?self.config.key_tool.front_end,
            poll_period_secs = self.config.scheduler.poll_period_secs,
            "WARD daemon started"
        );

        let cycles = self.controller.run_until(shutdown_signal()).await?;

        tracing::info!(cycles, "WARD daemon shutting down");
        Ok(())
    }
}

async fn build_ledger(config: &WardConfig) -> DaemonResult<Arc<dyn LedgerGateway>> {
    match config.ledger.kind {
        LedgerKind::Memory => {
            let ledger = match &config.ledger.fixture {
                Some(path) => {
                    tracing::info!(fixture = %path.display(), "Seeding in-memory ledger");
                    LedgerFixture::load(path)?.into_ledger().await
                }
                None => InMemoryLedger::new(config.validator.manager_address.clone()),
            };
            Ok(Arc::new(ledger))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, finishing after the current cycle");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, finishing after the current cycle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::error::{ConfigError, DaemonError};
    use std::io::Write;

    fn config() -> WardConfig {
        WardConfig {
            validator: ValidatorConfig {
                id: 7,
                manager_address: "MANAGER".to_string(),
                manager_secret: "secret".to_string(),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = Daemon::new(WardConfig::default()).await;
        assert!(matches!(result, Err(DaemonError::Config(ConfigError::Invalid(_)))));
    }

    #[tokio::test]
    async fn test_run_once_on_fixture_ledger() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Contract bound to another validator: nothing for us to do
        write!(
            file,
            r#"{{
                "round": 500,
                "manager": "MANAGER",
                "contracts": [
                    {{ "id": 1, "validator_id": 99, "account": "ACC", "round_start": 100, "round_end": 200 }}
                ]
            }}"#
        )
        .unwrap();

        let mut config = config();
        config.ledger.fixture = Some(file.path().to_path_buf());

        let daemon = Daemon::new(config).await.unwrap();
        let report = daemon.run_once().await.unwrap();
        assert_eq!(report.round, 500);
        assert_eq!(report.created + report.deposited + report.active, 0);
    }

    #[tokio::test]
    async fn test_missing_fixture() {
        let mut config = config();
        config.ledger.fixture = Some("/nonexistent/ledger.json".into());
        let result = Daemon::new(config).await;
        assert!(matches!(result, Err(DaemonError::Fixture(_))));
    }
}
