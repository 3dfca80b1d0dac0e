//! Textual contract of the key tool's output
//!
//! Every assumption about the tool's free-text output (labels, their order,
//! block size, delimiters, the identifier marker) lives in one versioned
//! [`KeyInfoGrammar`]. A tool release that changes its output format is
//! handled by adding a grammar, not by touching the parser.
//!
//! `partkeyinfo` output:
//!
//! ```text
//! Dumping participation key info from /var/lib/algorand/...
//!
//! Participation ID:          QW4KF...
//! Parent address:            7XRZ...
//! Last vote round:           N/A
//! ...
//! State proof key:           c3Rh...
//!
//! Participation ID:          ...
//! ```

/// Fields of one key block, in the order the tool prints them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    ParticipationId,
    ParentAddress,
    LastVoteRound,
    LastBlockProposalRound,
    EffectiveFirstRound,
    EffectiveLastRound,
    FirstRound,
    LastRound,
    KeyDilution,
    SelectionKey,
    VotingKey,
    StateProofKey,
}

impl KeyField {
    pub const ALL: [KeyField; 12] = [
        KeyField::ParticipationId,
        KeyField::ParentAddress,
        KeyField::LastVoteRound,
        KeyField::LastBlockProposalRound,
        KeyField::EffectiveFirstRound,
        KeyField::EffectiveLastRound,
        KeyField::FirstRound,
        KeyField::LastRound,
        KeyField::KeyDilution,
        KeyField::SelectionKey,
        KeyField::VotingKey,
        KeyField::StateProofKey,
    ];

    /// Position of the field inside a block
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Versioned description of the key tool's output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfoGrammar {
    /// Grammar version, logged when output is rejected
    pub version: &'static str,

    /// Required labels, indexed by [`KeyField::index`]
    pub labels: [&'static str; 12],

    /// Marker preceding the new identifier in `addpartkey` output
    pub identifier_marker: &'static str,

    /// Line of `addpartkey` output carrying the identifier
    pub identifier_line: usize,

    /// Lines of `listpartkeys` output that are not keys (header + trailing newline)
    pub list_overhead: usize,
}

/// Output format of `goal account partkeyinfo` / `listpartkeys` / `addpartkey`
pub const GOAL_V1: KeyInfoGrammar = KeyInfoGrammar {
    version: "goal-v1",
    labels: [
        "Participation ID",
        "Parent address",
        "Last vote round",
        "Last block proposal round",
        "Effective first round",
        "Effective last round",
        "First round",
        "Last round",
        "Key dilution",
        "Selection key",
        "Voting key",
        "State proof key",
    ],
    identifier_marker: "Participation ID: ",
    identifier_line: 1,
    list_overhead: 2,
};

impl Default for KeyInfoGrammar {
    fn default() -> Self {
        GOAL_V1
    }
}

impl KeyInfoGrammar {
    /// Lines per key block
    pub fn block_len(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, field: KeyField) -> &'static str {
        self.labels[field.index()]
    }

    /// Number of keys announced by `listpartkeys` output
    pub fn expected_records(&self, list_output: &str) -> usize {
        list_output.split('\n').count().saturating_sub(self.list_overhead)
    }

    /// Split `partkeyinfo` output into key blocks.
    ///
    /// Everything up to the first blank line is preamble. After that, blank
    /// lines delimit blocks; runs of blank lines do not produce empty blocks.
    pub fn split_blocks<'a>(&self, info_output: &'a str) -> Vec<Vec<&'a str>> {
        let mut lines = info_output.lines().skip_while(|line| !is_delimiter(line));

        let mut blocks = Vec::new();
        let mut current = Vec::with_capacity(self.block_len());
        // The first delimiter closes the preamble
        lines.next();
        for line in lines {
            if is_delimiter(line) {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
            } else {
                current.push(line);
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        blocks
    }

    /// Split a `label: value` line on its first colon, stripping both sides
    pub fn split_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        line.split_once(':')
            .map(|(label, value)| (label.trim(), value.trim()))
    }

    /// Identifier announced by `addpartkey` output
    pub fn extract_identifier<'a>(&self, output: &'a str) -> Option<&'a str> {
        let line = output.lines().nth(self.identifier_line)?;
        let start = line.find(self.identifier_marker)? + self.identifier_marker.len();
        let id = line[start..].trim();
        (!id.is_empty()).then_some(id)
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim().is_empty()
}
