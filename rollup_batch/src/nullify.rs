//! The nullification table shared by every L1 transaction type.
//!
//! An L1 transaction is already final on the base chain, so the rollup cannot
//! refuse it. When it does not match the state it is applied with a zero
//! load amount, a zero amount, or both, and stays in the batch.

use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::tx::L1TxType;

/// State checks an L1 transaction failed. Only the checks its type enables
/// are ever set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mismatches {
    /// The sender account holds another token.
    pub token_from: bool,
    /// The sender account belongs to another address.
    pub eth_addr: bool,
    /// The receiver holds another token or does not exist.
    pub token_to: bool,
}

/// Which amounts of an L1 transaction are forced to zero.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nullify {
    pub load_amount: bool,
    pub amount: bool,
}

impl Nullify {
    pub const NONE: Self = Self {
        load_amount: false,
        amount: false,
    };

    /// The load is refused when it would credit a balance of another token,
    /// the amount on any mismatch at all.
    pub const fn from_mismatches(m: Mismatches) -> Self {
        Self {
            load_amount: m.token_from,
            amount: m.token_from || m.eth_addr || m.token_to,
        }
    }

    pub const fn any(self) -> bool {
        self.load_amount || self.amount
    }
}

/// What an L1 transfer does when the sender cannot cover it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shortfall {
    /// Move nothing.
    Nullify,
    /// Move whatever the sender holds.
    Cap,
}

impl Shortfall {
    pub const fn for_type(tx_type: L1TxType) -> Self {
        match tx_type {
            L1TxType::ForceExit => Self::Cap,
            _ => Self::Nullify,
        }
    }

    /// Settles `amount` against `balance`. Returns the amount that moves and
    /// whether the shortfall changed it.
    pub fn settle(self, balance: U256, amount: U256) -> (U256, bool) {
        if amount <= balance {
            return (amount, false);
        }
        match self {
            Self::Nullify => (U256::zero(), true),
            Self::Cap => (balance, true),
        }
    }
}
