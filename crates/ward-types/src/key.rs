//! Participation key types
//!
//! A [`ParticipationKeyRecord`] mirrors one entry of the key tool's table as
//! text. [`KeyMaterial`] is the decoded form submitted with a deposit.

use crate::{Account, ParticipationId};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key dilution for a validity window of `round_start..=round_end`.
///
/// Proportional to the square root of the span, never below one.
pub fn key_dilution(round_start: u64, round_end: u64) -> u64 {
    let span = round_end.saturating_sub(round_start);
    ((span as f64).sqrt().round() as u64).max(1)
}

/// One participation key as reported by the key tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationKeyRecord {
    /// Identifier assigned by the key tool
    pub id: ParticipationId,

    /// Account the key participates for
    pub account: Account,

    /// Selection key (base64)
    pub selection_key: String,

    /// Vote key (base64)
    pub vote_key: String,

    /// State proof key (base64)
    pub state_proof_key: String,

    /// Vote key dilution
    pub key_dilution: u64,

    /// First valid round
    pub round_start: u64,

    /// Last valid round
    pub round_end: u64,

    pub last_vote_round: Option<u64>,
    pub last_block_proposal_round: Option<u64>,
    pub effective_first_round: Option<u64>,
    pub effective_last_round: Option<u64>,
}

impl ParticipationKeyRecord {
    /// Decode the transport-encoded key blobs for a deposit
    pub fn key_material(&self) -> Result<KeyMaterial, KeyEncodingError> {
        Ok(KeyMaterial {
            selection_key: decode("selection key", &self.selection_key)?,
            vote_key: decode("vote key", &self.vote_key)?,
            state_proof_key: decode("state proof key", &self.state_proof_key)?,
            key_dilution: self.key_dilution,
            round_start: self.round_start,
            round_end: self.round_end,
        })
    }
}

fn decode(field: &'static str, value: &str) -> Result<Vec<u8>, KeyEncodingError> {
    STANDARD
        .decode(value)
        .map_err(|e| KeyEncodingError { field, reason: e.to_string() })
}

/// Key fields as they are submitted to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub selection_key: Vec<u8>,
    pub vote_key: Vec<u8>,
    pub state_proof_key: Vec<u8>,
    pub key_dilution: u64,
    pub round_start: u64,
    pub round_end: u64,
}

/// A key blob was not valid base64
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid encoding of {field}: {reason}")]
pub struct KeyEncodingError {
    pub field: &'static str,
    pub reason: String,
}
