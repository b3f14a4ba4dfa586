//! Acceptance rules for proof-of-work.
//!
//! A criterion travels as a `{type, difficulty}` record that may name any
//! type. It must be resolved into a known [`MiningCriterion`] before use;
//! an unknown type is a configuration error and is never treated as a rule
//! that accepts or rejects everything.

use serde::{Serialize, Deserialize};

use crate::utils::*;
use crate::error::{Error, ErrorKind};


/// Wire type of the leading-zeros criterion.
pub const LEADING_ZEROS: &str = "leading_zeros";


/// Wire form of a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: u64,
}


/// Known acceptance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningCriterion {
    /// The hex hash must start with this many `'0'` characters.
    LeadingZeros(u64),
}


impl CriterionRecord {
    /// Create a record.
    pub fn new(kind: &str, difficulty: u64) -> Self {
        Self { kind: kind.to_string(), difficulty }
    }

    /// Record of the leading-zeros criterion.
    pub fn leading_zeros(difficulty: u64) -> Self {
        Self::new(LEADING_ZEROS, difficulty)
    }

    /// Resolve and evaluate against `hash`. Fails for an unknown type.
    pub fn check(&self, hash: &str) -> Result<bool> {
        let criterion = MiningCriterion::try_from(self)?;
        Ok(criterion.check(hash))
    }
}


impl MiningCriterion {
    /// Evaluate the rule against a lowercase hex hash.
    pub fn check(&self, hash: &str) -> bool {
        match self {
            Self::LeadingZeros(difficulty) => {
                let difficulty = *difficulty as usize;
                hash.len() >= difficulty &&
                    hash.bytes().take(difficulty).all(|b| b == b'0')
            },
        }
    }

    /// Difficulty of the rule.
    pub fn difficulty(&self) -> u64 {
        match self {
            Self::LeadingZeros(difficulty) => *difficulty,
        }
    }

    /// Wire form.
    pub fn record(&self) -> CriterionRecord {
        match self {
            Self::LeadingZeros(difficulty) =>
                CriterionRecord::leading_zeros(*difficulty),
        }
    }
}


impl TryFrom<&CriterionRecord> for MiningCriterion {
    type Error = Error;

    fn try_from(record: &CriterionRecord) -> Result<Self> {
        match record.kind.as_str() {
            LEADING_ZEROS => Ok(Self::LeadingZeros(record.difficulty)),
            other => Err(Error::new(
                ErrorKind::UnknownCriterion,
                format!("unknown mining criterion type: {}", other),
            )),
        }
    }
}
