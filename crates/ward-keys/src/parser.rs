//! Key table parsing
//!
//! Turns the output of `listpartkeys` and `partkeyinfo` into a [`KeyTable`].
//! The batch is accepted or rejected as a whole: one malformed block means
//! the tool speaks a format we do not understand, and provisioning should
//! stall visibly instead of working from a partial table.

use crate::error::ParseFormatError;
use crate::grammar::{KeyField, KeyInfoGrammar, GOAL_V1};
use tracing::Span;
use ward_types::{Account, ParticipationId, ParticipationKeyRecord};

/// Participation keys known to the key tool, in tool order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    records: Vec<ParticipationKeyRecord>,
}

impl KeyTable {
    pub fn new(records: Vec<ParticipationKeyRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ParticipationKeyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records carrying the given participation id
    pub fn find_by_id(&self, id: &ParticipationId) -> Vec<&ParticipationKeyRecord> {
        self.records.iter().filter(|r| &r.id == id).collect()
    }

    /// Records participating for the given account
    pub fn owned_by(&self, account: &Account) -> Vec<&ParticipationKeyRecord> {
        self.records.iter().filter(|r| &r.account == account).collect()
    }

    pub fn into_records(self) -> Vec<ParticipationKeyRecord> {
        self.records
    }
}

/// Parser for the key tool's table output
#[derive(Debug, Clone)]
pub struct KeyRecordParser {
    grammar: KeyInfoGrammar,
    span: Span,
}

impl Default for KeyRecordParser {
    fn default() -> Self {
        Self::new(GOAL_V1)
    }
}

impl KeyRecordParser {
    pub fn new(grammar: KeyInfoGrammar) -> Self {
        let span = tracing::info_span!("key_parser", grammar = grammar.version);
        Self { grammar, span }
    }

    pub fn grammar(&self) -> &KeyInfoGrammar {
        &self.grammar
    }

    /// Parse a key table, degrading any format problem to `None`.
    ///
    /// `None` means the key state is unknown for this cycle; callers retry on
    /// the next one.
    pub fn parse(&self, list_output: &str, info_output: &str) -> Option<KeyTable> {
        let _entered = self.span.enter();
        match self.parse_strict(list_output, info_output) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!(error = %e, "Key tool output rejected, no key table this cycle");
                None
            }
        }
    }

    /// Parse a key table, reporting why the output was rejected
    pub fn parse_strict(
        &self,
        list_output: &str,
        info_output: &str,
    ) -> Result<KeyTable, ParseFormatError> {
        let blocks = self.grammar.split_blocks(info_output);

        let fields = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| self.block_fields(i, block))
            .collect::<Result<Vec<_>, _>>()?;

        let listed = self.grammar.expected_records(list_output);
        if listed != fields.len() {
            return Err(ParseFormatError::CountMismatch {
                listed,
                parsed: fields.len(),
            });
        }

        fields
            .into_iter()
            .enumerate()
            .map(|(i, values)| self.record(i, &values))
            .collect::<Result<Vec<_>, _>>()
            .map(KeyTable::new)
    }

    /// Check a block against the grammar and return its values in field order
    fn block_fields<'a>(&self, block: usize, lines: &[&'a str]) -> Result<Vec<&'a str>, ParseFormatError> {
        if lines.len() != self.grammar.block_len() {
            return Err(ParseFormatError::BlockLength {
                block,
                expected: self.grammar.block_len(),
                found: lines.len(),
            });
        }

        lines
            .iter()
            .zip(self.grammar.labels.iter())
            .enumerate()
            .map(|(line, (raw, expected))| {
                let (label, value) = self
                    .grammar
                    .split_line(raw)
                    .ok_or(ParseFormatError::MalformedLine { block, line })?;
                if label != *expected {
                    return Err(ParseFormatError::LabelMismatch {
                        block,
                        line,
                        expected,
                        found: label.to_string(),
                    });
                }
                Ok(value)
            })
            .collect()
    }

    fn record(&self, block: usize, values: &[&str]) -> Result<ParticipationKeyRecord, ParseFormatError> {
        let text = |field: KeyField| values[field.index()].to_string();
        let number = |field: KeyField| {
            values[field.index()]
                .parse::<u64>()
                .map_err(|_| ParseFormatError::InvalidNumber {
                    block,
                    label: self.grammar.label(field),
                    value: values[field.index()].to_string(),
                })
        };
        // Rounds that have not happened yet are printed as N/A
        let optional = |field: KeyField| values[field.index()].parse::<u64>().ok();

        let round_start = number(KeyField::FirstRound)?;
        let round_end = number(KeyField::LastRound)?;
        if round_start > round_end {
            return Err(ParseFormatError::InvertedRounds {
                block,
                first: round_start,
                last: round_end,
            });
        }

        Ok(ParticipationKeyRecord {
            id: ParticipationId::new(text(KeyField::ParticipationId)),
            account: Account::new(text(KeyField::ParentAddress)),
            selection_key: text(KeyField::SelectionKey),
            vote_key: text(KeyField::VotingKey),
            state_proof_key: text(KeyField::StateProofKey),
            key_dilution: number(KeyField::KeyDilution)?,
            round_start,
            round_end,
            last_vote_round: optional(KeyField::LastVoteRound),
            last_block_proposal_round: optional(KeyField::LastBlockProposalRound),
            effective_first_round: optional(KeyField::EffectiveFirstRound),
            effective_last_round: optional(KeyField::EffectiveLastRound),
        })
    }
}
