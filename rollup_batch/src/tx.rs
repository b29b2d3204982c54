//! Raw rollup transactions as submitted, before any state is consulted.

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::account::{BjjCompressed, Idx, TokenId};
use crate::constants::{EXIT_IDX, FIRST_IDX};
use crate::error::TxRejection;
use crate::fee::FeeSelector;
use crate::float16::Float16;
use crate::signature::Signature;

/// A transaction forced from the base chain. It needs no signature: the
/// rollup contract vouches for `from_eth_addr`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Tx {
    /// 0 to create a new account.
    pub from_idx: Idx,
    pub load_amount_f: Float16,
    pub token_id: TokenId,
    pub from_bjj: BjjCompressed,
    pub from_eth_addr: Address,
    /// 0 for none, [`EXIT_IDX`] to exit.
    pub to_idx: Idx,
    pub amount_f: Float16,
}

/// The six shapes an L1 transaction can take.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum L1TxType {
    CreateAccountDeposit,
    CreateAccountDepositTransfer,
    Deposit,
    DepositTransfer,
    ForceTransfer,
    ForceExit,
}

/// Which parts of an L1 transaction take effect and which fields are checked
/// against the state before they do.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct L1Checks {
    pub new_account: bool,
    pub is_load: bool,
    pub is_amount: bool,
    pub check_eth_addr: bool,
    pub check_token_from: bool,
    pub check_token_to: bool,
}

impl L1TxType {
    pub const fn checks(self) -> L1Checks {
        let (new_account, is_load, is_amount, check_eth_addr, check_token_from, check_token_to) =
            match self {
                Self::CreateAccountDeposit => (true, true, false, false, false, false),
                Self::CreateAccountDepositTransfer => (true, true, true, false, false, true),
                Self::Deposit => (false, true, false, false, true, false),
                Self::DepositTransfer => (false, true, true, true, true, true),
                Self::ForceTransfer => (false, false, true, true, true, true),
                Self::ForceExit => (false, false, true, true, true, false),
            };
        L1Checks {
            new_account,
            is_load,
            is_amount,
            check_eth_addr,
            check_token_from,
            check_token_to,
        }
    }

    pub const fn is_exit(self) -> bool {
        matches!(self, Self::ForceExit)
    }
}

fn is_reserved(idx: Idx) -> bool {
    (EXIT_IDX + 1..FIRST_IDX).contains(&idx)
}

impl L1Tx {
    /// Classifies the transaction by which fields are set.
    pub fn tx_type(&self) -> Result<L1TxType, TxRejection> {
        for idx in [self.from_idx, self.to_idx] {
            if is_reserved(idx) {
                return Err(TxRejection::ReservedIndex(idx));
            }
        }

        let has_load = !self.load_amount_f.is_zero();
        let has_amount = !self.amount_f.is_zero();
        let to_account = self.to_idx >= FIRST_IDX;

        let tx_type = match (self.from_idx, self.to_idx) {
            (0, 0) if !has_amount => Some(L1TxType::CreateAccountDeposit),
            (0, _) if to_account => Some(L1TxType::CreateAccountDepositTransfer),
            (from, 0) if from >= FIRST_IDX && !has_amount => Some(L1TxType::Deposit),
            (from, _) if from >= FIRST_IDX && to_account => Some(if has_load {
                L1TxType::DepositTransfer
            } else {
                L1TxType::ForceTransfer
            }),
            (from, EXIT_IDX) if from >= FIRST_IDX && !has_load => Some(L1TxType::ForceExit),
            _ => None,
        };

        tx_type.ok_or(TxRejection::MalformedL1 {
            from_idx: self.from_idx,
            to_idx: self.to_idx,
            load_amount_f: self.load_amount_f.0,
            amount_f: self.amount_f.0,
        })
    }
}

/// An off-chain transaction signed by the owner of `from_idx`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Tx {
    pub from_idx: Idx,
    /// An existing account or [`EXIT_IDX`].
    pub to_idx: Idx,
    pub token_id: TokenId,
    /// Must be exactly representable as a [`Float16`].
    pub amount: U256,
    pub fee: FeeSelector,
    pub nonce: u64,
    pub signature: Signature,
}

/// Any transaction a batch can hold.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "camelCase")]
pub enum Tx {
    L1(L1Tx),
    L2(L2Tx),
}

impl From<L1Tx> for Tx {
    fn from(tx: L1Tx) -> Self {
        Self::L1(tx)
    }
}

impl From<L2Tx> for Tx {
    fn from(tx: L2Tx) -> Self {
        Self::L2(tx)
    }
}
