//! Batch parameters. These fix the shape of the circuit a batch is proven
//! with, so every width derived here must match the one the prover uses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    idx_bits, l2_tx_bits, CHAIN_ID_BITS, L1_TX_BITS, MAX_IDX_BITS, MAX_NLEVELS, ROOT_BITS,
};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    #[error("nLevels must be between 1 and 48 (got: {0})")]
    InvalidLevels(usize),

    #[error("a batch must hold at least one transaction")]
    EmptyBatch,

    #[error("maxL1Tx ({max_l1_tx}) exceeds nTx ({n_tx})")]
    L1ExceedsTotal { max_l1_tx: usize, n_tx: usize },

    #[error("invalid batch config: {0}")]
    Json(String),
}

/// Capacities and chain parameters of one batch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    /// Total transaction slots, L1 and L2 together.
    pub n_tx: usize,
    /// Depth of the account tree.
    pub n_levels: usize,
    pub max_l1_tx: usize,
    /// Number of fee receiver slots.
    pub max_fee_tx: usize,
    pub chain_id: u16,
}

impl BatchConfig {
    pub fn new(
        n_tx: usize,
        n_levels: usize,
        max_l1_tx: usize,
        max_fee_tx: usize,
        chain_id: u16,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            n_tx,
            n_levels,
            max_l1_tx,
            max_fee_tx,
            chain_id,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_levels == 0 || self.n_levels > MAX_NLEVELS {
            return Err(ConfigError::InvalidLevels(self.n_levels));
        }
        if self.n_tx == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        if self.max_l1_tx > self.n_tx {
            return Err(ConfigError::L1ExceedsTotal {
                max_l1_tx: self.max_l1_tx,
                n_tx: self.n_tx,
            });
        }
        Ok(())
    }

    /// Largest index the account tree can hold.
    pub fn max_idx(&self) -> u64 {
        (1u64 << self.n_levels) - 1
    }

    pub fn idx_bits(&self) -> usize {
        idx_bits(self.n_levels)
    }

    pub fn l2_tx_bits(&self) -> usize {
        l2_tx_bits(self.n_levels)
    }

    pub fn l1_txs_bits(&self) -> usize {
        self.max_l1_tx * L1_TX_BITS
    }

    pub fn l2_txs_bits(&self) -> usize {
        self.n_tx * self.l2_tx_bits()
    }

    pub fn fee_txs_bits(&self) -> usize {
        self.max_fee_tx * self.idx_bits()
    }

    /// Width of the whole public input bit string.
    pub fn total_bits(&self) -> usize {
        2 * MAX_IDX_BITS
            + 3 * ROOT_BITS
            + self.l1_txs_bits()
            + self.l2_txs_bits()
            + self.fee_txs_bits()
            + CHAIN_ID_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_for_sixteen_levels() {
        let config = BatchConfig::new(2, 16, 1, 1, 0).unwrap();
        assert_eq!(config.idx_bits(), 16);
        assert_eq!(config.l2_tx_bits(), 56);
        assert_eq!(config.l1_txs_bits(), 576);
        assert_eq!(config.l2_txs_bits(), 112);
        assert_eq!(config.fee_txs_bits(), 16);
        assert_eq!(config.total_bits(), 96 + 768 + 576 + 112 + 16 + 16);
        assert_eq!(config.total_bits() % 8, 0);
        assert_eq!(config.max_idx(), 65535);
    }

    #[test]
    fn odd_levels_round_up_to_bytes() {
        let config = BatchConfig::new(3, 17, 2, 2, 0).unwrap();
        assert_eq!(config.idx_bits(), 24);
        assert_eq!(config.l2_tx_bits(), 72);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert_eq!(
            BatchConfig::new(2, 0, 1, 1, 0),
            Err(ConfigError::InvalidLevels(0))
        );
        assert_eq!(
            BatchConfig::new(2, 49, 1, 1, 0),
            Err(ConfigError::InvalidLevels(49))
        );
        assert_eq!(BatchConfig::new(0, 16, 0, 1, 0), Err(ConfigError::EmptyBatch));
        assert_eq!(
            BatchConfig::new(2, 16, 3, 1, 0),
            Err(ConfigError::L1ExceedsTotal {
                max_l1_tx: 3,
                n_tx: 2
            })
        );
    }

    #[test]
    fn loads_from_json() {
        let config = BatchConfig::from_json_str(
            r#"{"nTx": 3, "nLevels": 16, "maxL1Tx": 2, "maxFeeTx": 2, "chainId": 5}"#,
        )
        .unwrap();
        assert_eq!(config, BatchConfig::new(3, 16, 2, 2, 5).unwrap());

        assert!(matches!(
            BatchConfig::from_json_str(r#"{"nTx": 3}"#),
            Err(ConfigError::Json(_))
        ));
        assert_eq!(
            BatchConfig::from_json_str(
                r#"{"nTx": 1, "nLevels": 16, "maxL1Tx": 2, "maxFeeTx": 2, "chainId": 5}"#
            ),
            Err(ConfigError::L1ExceedsTotal {
                max_l1_tx: 2,
                n_tx: 1
            })
        );
    }
}
