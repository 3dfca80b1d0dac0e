//! Key provisioning gateway
//!
//! Generates, looks up and deletes participation keys by driving the key
//! tool through a [`CommandRunner`]. The gateway keeps no table between
//! calls: every lookup re-reads the tool's state.

use crate::command::{CommandOutput, CommandRunner, ToolFrontEnd, ToolInvocation};
use crate::error::{CommandError, KeyError, Result};
use crate::parser::{KeyRecordParser, KeyTable};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;
use ward_types::{key_dilution, Account, ParticipationId, ParticipationKeyRecord};

const ADD: &str = "addpartkey";
const DELETE: &str = "deletepartkey";
const LIST: &str = "listpartkeys";
const INFO: &str = "partkeyinfo";

/// Gateway to the external key tool
#[derive(Clone)]
pub struct KeyProvisioningGateway {
    runner: Arc<dyn CommandRunner>,
    front_end: ToolFrontEnd,
    parser: KeyRecordParser,
}

impl fmt::Debug for KeyProvisioningGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyProvisioningGateway")
            .field("front_end", &self.front_end)
            .field("grammar", &self.parser.grammar().version)
            .finish()
    }
}

impl KeyProvisioningGateway {
    pub fn new(runner: Arc<dyn CommandRunner>, front_end: ToolFrontEnd) -> Self {
        Self {
            runner,
            front_end,
            parser: KeyRecordParser::default(),
        }
    }

    /// Use a parser for a different tool output grammar
    pub fn with_parser(mut self, parser: KeyRecordParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn front_end(&self) -> ToolFrontEnd {
        self.front_end
    }

    async fn execute(&self, invocation: &ToolInvocation) -> std::result::Result<CommandOutput, CommandError> {
        self.runner.run(invocation).await?.into_success(invocation)
    }

    /// Generate a key for `account` valid from `round_start` to `round_end`.
    ///
    /// On error no key may be assumed to exist.
    #[instrument(skip(self, account), fields(component = "key_gateway", account = %account))]
    pub async fn generate(&self, account: &Account, round_start: u64, round_end: u64) -> Result<ParticipationId> {
        let dilution = key_dilution(round_start, round_end);
        let invocation = self.front_end.invocation(
            ADD,
            [
                format!("-a={}", account),
                format!("--roundFirstValid={}", round_start),
                format!("--roundLastValid={}", round_end),
                format!("--keyDilution={}", dilution),
            ],
        );

        let output = self.execute(&invocation).await.map_err(|e| {
            tracing::warn!(error = %e, "Key generation failed");
            e
        })?;

        let id = self
            .parser
            .grammar()
            .extract_identifier(&output.stdout)
            .map(ParticipationId::new)
            .ok_or_else(|| KeyError::MissingIdentifier(output.stdout.clone()))?;

        tracing::info!(participation_id = %id, dilution, "Generated participation key");
        Ok(id)
    }

    /// Delete a key, reporting success and the tool's raw output.
    ///
    /// Never fails: deleting an absent key is an expected outcome the caller
    /// decides how to treat.
    #[instrument(skip(self, id), fields(component = "key_gateway", participation_id = %id))]
    pub async fn delete(&self, id: &ParticipationId) -> (bool, String) {
        let invocation = self.front_end.invocation(DELETE, [format!("--partkeyid={}", id)]);
        match self.runner.run(&invocation).await {
            Ok(output) if output.success() => {
                tracing::info!("Deleted participation key");
                (true, output.stdout)
            }
            Ok(output) => {
                tracing::info!(status = ?output.status, stderr = %output.stderr.trim(), "Key deletion reported failure");
                (false, output.stdout)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Key deletion could not run");
                (false, e.to_string())
            }
        }
    }

    /// Read the tool's current key table
    #[instrument(skip(self), fields(component = "key_gateway"))]
    pub async fn refresh(&self) -> Result<KeyTable> {
        let no_args: [&str; 0] = [];
        let list = self.execute(&self.front_end.invocation(LIST, no_args)).await?;
        let info = self.execute(&self.front_end.invocation(INFO, no_args)).await?;

        self.parser
            .parse(&list.stdout, &info.stdout)
            .ok_or(KeyError::TableUnavailable)
    }

    /// Identifier of the single key held by `account`
    pub async fn lookup(&self, account: &Account) -> Result<ParticipationId> {
        let table = self.refresh().await?;
        let record = unique(table.owned_by(account), account)?;
        Ok(record.id.clone())
    }

    /// Every key held by `account`, possibly none
    pub async fn keys_for_account(&self, account: &Account) -> Result<Vec<ParticipationKeyRecord>> {
        let table = self.refresh().await?;
        Ok(table.owned_by(account).into_iter().cloned().collect())
    }

    /// Full record of the key with the given identifier
    pub async fn details(&self, id: &ParticipationId) -> Result<ParticipationKeyRecord> {
        let table = self.refresh().await?;
        unique(table.find_by_id(id), id).cloned()
    }

    /// Delete every key held by `account`.
    ///
    /// `NotFound` when the account holds none. Reports whether all deletions
    /// succeeded, along with the tool's combined output.
    pub async fn delete_for_account(&self, account: &Account) -> Result<(bool, String)> {
        let held = self.keys_for_account(account).await?;
        if held.is_empty() {
            return Err(KeyError::NotFound(account.to_string()));
        }

        let mut all_deleted = true;
        let mut output = String::new();
        for key in &held {
            let (deleted, out) = self.delete(&key.id).await;
            all_deleted &= deleted;
            output.push_str(&out);
        }
        Ok((all_deleted, output))
    }
}

fn unique<'a>(
    matches: Vec<&'a ParticipationKeyRecord>,
    subject: &dyn fmt::Display,
) -> Result<&'a ParticipationKeyRecord> {
    match matches.as_slice() {
        [] => Err(KeyError::NotFound(subject.to_string())),
        [record] => Ok(record),
        many => Err(KeyError::Ambiguous {
            subject: subject.to_string(),
            count: many.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeKeyTool;

    fn gateway(tool: &Arc<FakeKeyTool>, front_end: ToolFrontEnd) -> KeyProvisioningGateway {
        KeyProvisioningGateway::new(tool.clone(), front_end)
    }

    #[tokio::test]
    async fn test_generate_passes_window_and_dilution() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);

        let id = gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();

        let invocations = tool.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(
            invocations[0].to_string(),
            "goal account addpartkey -a=ACC --roundFirstValid=100 --roundLastValid=200 --keyDilution=10"
        );
        let record = gw.details(&id).await.unwrap();
        assert_eq!(record.account, Account::new("ACC"));
        assert_eq!((record.round_start, record.round_end, record.key_dilution), (100, 200, 10));
    }

    #[tokio::test]
    async fn test_generate_failure_is_command_error() {
        let tool = Arc::new(FakeKeyTool::new());
        tool.fail_subcommand(ADD);
        let gw = gateway(&tool, ToolFrontEnd::Algokit);

        let err = gw.generate(&Account::new("ACC"), 100, 200).await.unwrap_err();
        assert!(matches!(err, KeyError::Command(CommandError::Failed { .. })));
        assert!(tool.keys().is_empty());
    }

    #[tokio::test]
    async fn test_generate_spawn_failure() {
        let tool = Arc::new(FakeKeyTool::new());
        tool.set_installed(false);
        let err = gateway(&tool, ToolFrontEnd::Goal)
            .generate(&Account::new("ACC"), 100, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, KeyError::Command(CommandError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_lookup_unique_account() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);
        let id = gw.generate(&Account::new("ACC1"), 100, 200).await.unwrap();
        gw.generate(&Account::new("ACC2"), 100, 200).await.unwrap();

        assert_eq!(gw.lookup(&Account::new("ACC1")).await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_lookup_not_found_and_ambiguous() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);

        assert!(matches!(gw.lookup(&Account::new("ACC")).await, Err(KeyError::NotFound(_))));
        assert!(gw.keys_for_account(&Account::new("ACC")).await.unwrap().is_empty());

        gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();
        gw.generate(&Account::new("ACC"), 300, 400).await.unwrap();
        assert!(matches!(
            gw.lookup(&Account::new("ACC")).await,
            Err(KeyError::Ambiguous { count: 2, .. })
        ));
        assert_eq!(gw.keys_for_account(&Account::new("ACC")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_not_an_error() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);

        let (deleted, _) = gw.delete(&ParticipationId::new("MISSING")).await;
        assert!(!deleted);

        let id = gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();
        let (deleted, _) = gw.delete(&id).await;
        assert!(deleted);
        assert!(tool.keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_for_account() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);
        gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();

        let (deleted, _) = gw.delete_for_account(&Account::new("ACC")).await.unwrap();
        assert!(deleted);
        assert!(matches!(
            gw.delete_for_account(&Account::new("ACC")).await,
            Err(KeyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_for_account_removes_every_key() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);
        gw.generate(&Account::new("ACC"), 1, 9).await.unwrap();
        gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();
        gw.generate(&Account::new("OTHER"), 100, 200).await.unwrap();

        let (deleted, _) = gw.delete_for_account(&Account::new("ACC")).await.unwrap();
        assert!(deleted);
        assert_eq!(tool.calls(DELETE), 2);
        let left = tool.keys();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].account, Account::new("OTHER"));
    }

    #[tokio::test]
    async fn test_delete_for_account_on_unreadable_table() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);
        gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();

        tool.set_garbled(true);
        assert!(matches!(
            gw.delete_for_account(&Account::new("ACC")).await,
            Err(KeyError::TableUnavailable)
        ));
        assert_eq!(tool.calls(DELETE), 0);

        tool.set_garbled(false);
        tool.fail_subcommand(LIST);
        assert!(matches!(
            gw.delete_for_account(&Account::new("ACC")).await,
            Err(KeyError::Command(CommandError::Failed { .. }))
        ));
        assert_eq!(tool.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_garbled_table_is_unavailable() {
        let tool = Arc::new(FakeKeyTool::new());
        let gw = gateway(&tool, ToolFrontEnd::Goal);
        gw.generate(&Account::new("ACC"), 100, 200).await.unwrap();
        tool.set_garbled(true);

        assert!(matches!(gw.refresh().await, Err(KeyError::TableUnavailable)));
    }

    #[tokio::test]
    async fn test_missing_identifier() {
        let tool = Arc::new(FakeKeyTool::new());
        tool.set_silent_generation(true);
        let err = gateway(&tool, ToolFrontEnd::Goal)
            .generate(&Account::new("ACC"), 100, 200)
            .await
            .unwrap_err();
        assert!(matches!(err, KeyError::MissingIdentifier(_)));
    }
}
