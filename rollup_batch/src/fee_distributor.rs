//! Collection of L2 fees during a batch and their payout once every
//! transaction has been applied.

use std::collections::BTreeMap;

use ethereum_types::U256;
use log::{debug, warn};
use serde::Serialize;

use crate::account::{Idx, TokenId};
use crate::constants::BALANCE_BITS;
use crate::error::{BatchError, BatchResult};
use crate::l1::fits_balance;
use crate::store::AccountStore;

/// Fees collected so far, per token.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FeeAccumulator {
    totals: BTreeMap<TokenId, U256>,
}

/// One payout to a fee account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCredit {
    /// Position in the batch's fee index list.
    pub slot: usize,
    pub idx: Idx,
    pub token_id: TokenId,
    pub amount: U256,
}

impl FeeAccumulator {
    pub fn add(&mut self, token_id: TokenId, fee: U256) {
        if !fee.is_zero() {
            *self.totals.entry(token_id).or_default() += fee;
        }
    }

    pub fn total(&self, token_id: TokenId) -> U256 {
        self.totals.get(&token_id).copied().unwrap_or_default()
    }

    /// Per-token totals, ordered by token.
    pub fn totals(&self) -> &BTreeMap<TokenId, U256> {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Credits the collected fees to the accounts in `fee_idxs`.
    ///
    /// Each non-zero entry receives the total of the token its account holds.
    /// Index 0 burns the slot. When several slots name the same token only
    /// the first is paid, and fees of tokens without a slot are burned.
    pub fn distribute<A>(&self, fee_idxs: &[Idx], store: &mut A) -> BatchResult<Vec<FeeCredit>>
    where
        A: AccountStore + ?Sized,
    {
        let mut unpaid = self.totals.clone();
        let mut credits = vec![];

        for (slot, &idx) in fee_idxs.iter().enumerate() {
            if idx == 0 {
                continue;
            }
            let mut account = store
                .get(idx)
                .ok_or(BatchError::FeeAccountMissing { slot, idx })?
                .clone();
            let Some(amount) = unpaid.remove(&account.token_id) else {
                continue;
            };
            account.balance = account
                .balance
                .checked_add(amount)
                .filter(|b| fits_balance(*b))
                .ok_or(BatchError::FieldOverflow {
                    field: "balance",
                    value: account.balance,
                    width: BALANCE_BITS,
                })?;
            debug!("fee slot {slot}: credit {amount} of token {} to {idx}", account.token_id);
            credits.push(FeeCredit {
                slot,
                idx,
                token_id: account.token_id,
                amount,
            });
            store.put(account);
        }

        for (token_id, amount) in unpaid {
            warn!("burning {amount} of token {token_id} collected in fees: no fee account for it");
        }
        Ok(credits)
    }
}
