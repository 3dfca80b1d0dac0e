//! Test support: a scripted key tool
//!
//! [`FakeKeyTool`] answers the four `goal account` subcommands the gateway
//! issues, keeping its key table in memory and printing it in the
//! [`GOAL_V1`] format.

use crate::command::{CommandOutput, CommandRunner, ToolInvocation};
use crate::error::CommandError;
use crate::grammar::{KeyField, GOAL_V1};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use ward_types::{key_dilution, Account, ParticipationId, ParticipationKeyRecord};

/// `base64("selection-key")`
pub const SELECTION_KEY: &str = "c2VsZWN0aW9uLWtleQ==";
/// `base64("vote-key")`
pub const VOTE_KEY: &str = "dm90ZS1rZXk=";
/// `base64("state-proof-key")`
pub const STATE_PROOF_KEY: &str = "c3RhdGUtcHJvb2Yta2V5";

/// Render `listpartkeys` output: a header and one row per key
pub fn render_list(keys: &[ParticipationKeyRecord]) -> String {
    let mut out = String::from("Registered  Account  ParticipationID  Last Used  First round  Last round\n");
    for key in keys {
        out.push_str(&format!(
            "{:<10}  {}  {}  {}  {}  {}\n",
            "unknown", key.account, key.id, "N/A", key.round_start, key.round_end
        ));
    }
    out
}

/// Render `partkeyinfo` output: a preamble and one blank-separated block per key
pub fn render_info(keys: &[ParticipationKeyRecord]) -> String {
    let mut out = String::from("Dumping participation key info from /var/lib/algorand/mainnet-v1.0...\n");
    for key in keys {
        out.push('\n');
        for field in KeyField::ALL {
            out.push_str(&format!(
                "{:<27}{}\n",
                format!("{}:", GOAL_V1.label(field)),
                field_value(key, field)
            ));
        }
    }
    out
}

fn field_value(key: &ParticipationKeyRecord, field: KeyField) -> String {
    let round = |r: Option<u64>| r.map_or_else(|| "N/A".to_string(), |r| r.to_string());
    match field {
        KeyField::ParticipationId => key.id.to_string(),
        KeyField::ParentAddress => key.account.to_string(),
        KeyField::LastVoteRound => round(key.last_vote_round),
        KeyField::LastBlockProposalRound => round(key.last_block_proposal_round),
        KeyField::EffectiveFirstRound => round(key.effective_first_round),
        KeyField::EffectiveLastRound => round(key.effective_last_round),
        KeyField::FirstRound => key.round_start.to_string(),
        KeyField::LastRound => key.round_end.to_string(),
        KeyField::KeyDilution => key.key_dilution.to_string(),
        KeyField::SelectionKey => key.selection_key.clone(),
        KeyField::VotingKey => key.vote_key.clone(),
        KeyField::StateProofKey => key.state_proof_key.clone(),
    }
}

#[derive(Debug)]
struct FakeState {
    keys: Vec<ParticipationKeyRecord>,
    invocations: Vec<ToolInvocation>,
    failing: HashSet<String>,
    installed: bool,
    garbled: bool,
    silent_generation: bool,
    next_id: u32,
}

/// In-memory stand-in for the node's key tool
#[derive(Debug)]
pub struct FakeKeyTool {
    state: Mutex<FakeState>,
}

impl Default for FakeKeyTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeKeyTool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                keys: Vec::new(),
                invocations: Vec::new(),
                failing: HashSet::new(),
                installed: true,
                garbled: false,
                silent_generation: false,
                next_id: 1,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every invocation received, in order
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.state().invocations.clone()
    }

    /// Number of invocations of `subcommand`
    pub fn calls(&self, subcommand: &str) -> usize {
        self.state()
            .invocations
            .iter()
            .filter(|inv| subcommand_of(inv) == Some(subcommand))
            .count()
    }

    /// Keys currently held by the tool
    pub fn keys(&self) -> Vec<ParticipationKeyRecord> {
        self.state().keys.clone()
    }

    /// Add a key as if generated earlier
    pub fn insert(&self, record: ParticipationKeyRecord) {
        self.state().keys.push(record);
    }

    /// Make `subcommand` exit with status 1 until cleared
    pub fn fail_subcommand(&self, subcommand: &str) {
        self.state().failing.insert(subcommand.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// When not installed every invocation fails to spawn
    pub fn set_installed(&self, installed: bool) {
        self.state().installed = installed;
    }

    /// Print `partkeyinfo` with a renamed label
    pub fn set_garbled(&self, garbled: bool) {
        self.state().garbled = garbled;
    }

    /// Omit the identifier line from `addpartkey` output
    pub fn set_silent_generation(&self, silent: bool) {
        self.state().silent_generation = silent;
    }
}

fn subcommand_of(invocation: &ToolInvocation) -> Option<&str> {
    invocation
        .args
        .iter()
        .skip_while(|arg| arg.as_str() != "account")
        .nth(1)
        .map(String::as_str)
}

fn flag<'a>(invocation: &'a ToolInvocation, prefix: &str) -> Option<&'a str> {
    invocation.args.iter().find_map(|arg| arg.strip_prefix(prefix))
}

fn ok(stdout: String) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout,
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        status: Some(1),
        stdout: String::new(),
        stderr: format!("{}\n", stderr),
    }
}

impl FakeState {
    fn add(&mut self, invocation: &ToolInvocation) -> CommandOutput {
        let account = flag(invocation, "-a=");
        let start = flag(invocation, "--roundFirstValid=").and_then(|v| v.parse::<u64>().ok());
        let end = flag(invocation, "--roundLastValid=").and_then(|v| v.parse::<u64>().ok());
        let dilution = flag(invocation, "--keyDilution=").and_then(|v| v.parse::<u64>().ok());

        let (Some(account), Some(start), Some(end)) = (account, start, end) else {
            return failed("missing or invalid arguments");
        };

        let id = format!("PARTKEY{:04}", self.next_id);
        self.next_id += 1;
        self.keys.push(ParticipationKeyRecord {
            id: ParticipationId::new(id.clone()),
            account: Account::new(account),
            selection_key: SELECTION_KEY.to_string(),
            vote_key: VOTE_KEY.to_string(),
            state_proof_key: STATE_PROOF_KEY.to_string(),
            key_dilution: dilution.unwrap_or_else(|| key_dilution(start, end)),
            round_start: start,
            round_end: end,
            last_vote_round: None,
            last_block_proposal_round: None,
            effective_first_round: Some(start),
            effective_last_round: Some(end),
        });

        if self.silent_generation {
            ok("Participation key generation successful\n".to_string())
        } else {
            ok(format!(
                "Participation key generation successful\nParticipation ID: {}\n",
                id
            ))
        }
    }

    fn delete(&mut self, invocation: &ToolInvocation) -> CommandOutput {
        let Some(id) = flag(invocation, "--partkeyid=") else {
            return failed("missing --partkeyid");
        };
        let before = self.keys.len();
        self.keys.retain(|key| key.id.as_str() != id);
        if self.keys.len() == before {
            failed("participation key not found")
        } else {
            ok(String::new())
        }
    }

    fn info(&self) -> String {
        let info = render_info(&self.keys);
        if self.garbled {
            info.replace("Voting key", "Vote key")
        } else {
            info
        }
    }
}

impl FakeKeyTool {
    fn respond(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError> {
        let mut state = self.state();
        state.invocations.push(invocation.clone());

        if !state.installed {
            return Err(CommandError::Spawn {
                command: invocation.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "key tool not installed"),
            });
        }

        let subcommand = subcommand_of(invocation).unwrap_or_default();
        if state.failing.contains(subcommand) {
            return Ok(failed("scripted failure"));
        }

        Ok(match subcommand {
            "addpartkey" => state.add(invocation),
            "deletepartkey" => state.delete(invocation),
            "listpartkeys" => ok(render_list(&state.keys)),
            "partkeyinfo" => ok(state.info()),
            other => CommandOutput {
                status: Some(2),
                stdout: String::new(),
                stderr: format!("unknown command: {}\n", other),
            },
        })
    }
}

#[async_trait]
impl CommandRunner for FakeKeyTool {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError> {
        self.respond(invocation)
    }
}
