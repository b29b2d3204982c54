//! Validation of signed L2 transactions.
//!
//! Unlike L1 transactions nothing forces an L2 transaction into a batch, so
//! any failed check rejects it outright.

use ethereum_types::U256;
use log::debug;
use serde::Serialize;

use crate::account::{Idx, TokenId};
use crate::constants::{EXIT_IDX, FIRST_IDX, NONCE_BITS};
use crate::error::TxRejection;
use crate::fee::{compute_fee, FeeSelector};
use crate::float16::Float16;
use crate::signature::{l2_amount_f, l2_message, SignatureScheme};
use crate::store::AccountStore;
use crate::tx::L2Tx;

/// An accepted L2 transaction with its fee resolved.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveL2Tx {
    pub from_idx: Idx,
    pub to_idx: Idx,
    pub token_id: TokenId,
    pub amount: U256,
    pub amount_f: Float16,
    pub fee_selector: FeeSelector,
    /// Fee deducted from the sender on top of `amount`.
    pub fee: U256,
    /// Sender nonce the transaction consumes.
    pub nonce: u64,
}

impl EffectiveL2Tx {
    pub fn is_exit(&self) -> bool {
        self.to_idx == EXIT_IDX
    }
}

/// Checks `tx` against `store`.
pub fn interpret<A, S>(
    tx: &L2Tx,
    store: &A,
    scheme: &S,
    chain_id: u16,
) -> Result<EffectiveL2Tx, TxRejection>
where
    A: AccountStore + ?Sized,
    S: SignatureScheme + ?Sized,
{
    let from = store
        .get(tx.from_idx)
        .ok_or(TxRejection::UnknownAccount(tx.from_idx))?;
    if from.token_id != tx.token_id {
        return Err(TxRejection::TokenMismatch {
            idx: from.idx,
            account: from.token_id,
            tx: tx.token_id,
        });
    }

    if tx.to_idx != EXIT_IDX {
        if tx.to_idx < FIRST_IDX {
            return Err(TxRejection::InvalidL2Destination(tx.to_idx));
        }
        let to = store
            .get(tx.to_idx)
            .ok_or(TxRejection::UnknownAccount(tx.to_idx))?;
        if to.token_id != tx.token_id {
            return Err(TxRejection::TokenMismatch {
                idx: to.idx,
                account: to.token_id,
                tx: tx.token_id,
            });
        }
    }

    let amount_f = l2_amount_f(tx)?;
    let msg = l2_message(tx, chain_id)?;
    if !scheme.verify(&from.public_key, msg, &tx.signature) {
        return Err(TxRejection::BadSignature(from.idx));
    }

    if tx.nonce != from.nonce {
        return Err(TxRejection::BadNonce {
            idx: from.idx,
            expected: from.nonce,
            got: tx.nonce,
        });
    }
    if from.nonce + 1 >= 1 << NONCE_BITS {
        return Err(TxRejection::NonceOverflow(from.idx));
    }

    let fee = compute_fee(tx.amount, tx.fee)?;
    let needed = tx.amount + fee;
    if from.balance < needed {
        return Err(TxRejection::InsufficientBalance {
            idx: from.idx,
            balance: from.balance,
            needed,
        });
    }

    debug!(
        "L2 from {} to {}: amount {}, fee {fee} (selector {}), nonce {}",
        tx.from_idx, tx.to_idx, tx.amount, tx.fee, tx.nonce
    );

    Ok(EffectiveL2Tx {
        from_idx: tx.from_idx,
        to_idx: tx.to_idx,
        token_id: tx.token_id,
        amount: tx.amount,
        amount_f,
        fee_selector: tx.fee,
        fee,
        nonce: tx.nonce,
    })
}
