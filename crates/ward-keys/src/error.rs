//! Error types for key provisioning

use thiserror::Error;

/// The key tool could not be invoked, or it reported failure
#[derive(Debug, Error)]
pub enum CommandError {
    /// Process could not be started
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited with a non-zero (or no) status
    #[error("`{command}` exited with status {status:?}: {stderr}")]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Key tool output did not match the expected grammar
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFormatError {
    #[error("List reports {listed} keys but info contains {parsed}")]
    CountMismatch { listed: usize, parsed: usize },

    #[error("Block {block} has {found} lines, expected {expected}")]
    BlockLength {
        block: usize,
        expected: usize,
        found: usize,
    },

    #[error("Block {block} line {line}: expected label `{expected}`, found `{found}`")]
    LabelMismatch {
        block: usize,
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Block {block} line {line} is not a `label: value` pair")]
    MalformedLine { block: usize, line: usize },

    #[error("Block {block}: `{label}` is not a number: {value}")]
    InvalidNumber {
        block: usize,
        label: &'static str,
        value: String,
    },

    #[error("Block {block}: first round {first} is after last round {last}")]
    InvertedRounds { block: usize, first: u64, last: u64 },
}

/// Key provisioning errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// `addpartkey` succeeded but did not announce an identifier
    #[error("Key tool output carries no participation id: {0:?}")]
    MissingIdentifier(String),

    /// Key tool output could not be parsed this cycle
    #[error("Key table unavailable")]
    TableUnavailable,

    #[error("No participation key found for {0}")]
    NotFound(String),

    #[error("{count} participation keys found for {subject}, expected one")]
    Ambiguous { subject: String, count: usize },

    #[error(transparent)]
    Encoding(#[from] ward_types::KeyEncodingError),
}

/// Result type for key provisioning operations
pub type Result<T> = std::result::Result<T, KeyError>;
