use serde::{Serialize, Deserialize};

use crate::validate;
use crate::utils::*;
use crate::error::{Error, ErrorKind};
use crate::criterion::{CriterionRecord, MiningCriterion};
use crate::block::Block;
use crate::transaction::Transaction;


/// Attempts between two progress notifications.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Default difficulty of the leading-zeros criterion.
pub const DIFFICULTY: u64 = 3;

/// Length of a SHA-256 hex digest: more leading zeros can never be found.
pub const MAX_DIFFICULTY: u64 = 64;


/// Engine configuration. Every field has a default, so a partial JSON
/// document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts between progress notifications of the miner.
    pub progress_interval: u64,

    /// Criterion for blocks built locally.
    pub criterion: CriterionRecord,

    /// Highest accepted difficulty.
    pub max_difficulty: u64,
}


impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval: PROGRESS_INTERVAL,
            criterion: CriterionRecord::leading_zeros(DIFFICULTY),
            max_difficulty: MAX_DIFFICULTY,
        }
    }
}


impl EngineConfig {
    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            Error::new(ErrorKind::Config, format!("invalid config: {}", err))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration. The criterion must be known and reachable.
    pub fn validate(&self) -> Result<()> {
        validate!(self.progress_interval > 0, Config,
                  "progress_interval must be positive")?;
        validate!(self.max_difficulty <= MAX_DIFFICULTY, Config,
                  "max_difficulty must not exceed {}", MAX_DIFFICULTY)?;
        let criterion = MiningCriterion::try_from(&self.criterion)?;
        validate!(criterion.difficulty() <= self.max_difficulty, Config,
                  "difficulty {} exceeds {}", criterion.difficulty(),
                  self.max_difficulty)?;
        Ok(())
    }

    /// New pending block with the configured criterion.
    pub fn new_block(&self, index: &str, previous_hash: &str,
                     transactions: Vec<Transaction>, timestamp: &str) -> Block {
        Block::new(index, previous_hash, transactions, self.criterion.clone(),
                   timestamp)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.progress_interval, 10_000);
        assert_eq!(config.criterion, CriterionRecord::leading_zeros(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(
            r#"{"progress_interval": 500}"#
        ).unwrap();
        assert_eq!(config.progress_interval, 500);
        assert_eq!(config.criterion, CriterionRecord::leading_zeros(3));

        let config = EngineConfig::from_json(
            r#"{"criterion": {"type": "leading_zeros", "difficulty": 5}}"#
        ).unwrap();
        assert_eq!(config.criterion.difficulty, 5);
    }

    #[test]
    fn test_invalid() {
        let err = EngineConfig::from_json(r#"{"progress_interval": 0}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = EngineConfig::from_json(
            r#"{"criterion": {"type": "magic", "difficulty": 1}}"#
        ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCriterion);

        let err = EngineConfig::from_json(
            r#"{"criterion": {"type": "leading_zeros", "difficulty": 65}}"#
        ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = EngineConfig::from_json("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_new_block() {
        let config = EngineConfig::from_json(
            r#"{"criterion": {"type": "leading_zeros", "difficulty": 1}}"#
        ).unwrap();
        let block = config.new_block("3", "00ff", Vec::new(), "17");
        assert_eq!(block.criterion, CriterionRecord::leading_zeros(1));
        assert_eq!(block.nonce, "0");
    }
}
