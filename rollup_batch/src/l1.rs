//! Interpretation of L1 transactions against the running batch state.

use ethereum_types::U256;
use log::debug;
use serde::Serialize;

use crate::account::{Account, Idx, TokenId};
use crate::constants::BALANCE_BITS;
use crate::error::TxRejection;
use crate::nullify::{Mismatches, Nullify, Shortfall};
use crate::signature::{expand_or_identity, SignatureScheme};
use crate::store::AccountStore;
use crate::tx::{L1Tx, L1TxType};

/// An L1 transaction resolved against the state: the account it creates or
/// spends from, and the amounts that actually move.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveL1Tx {
    pub tx_type: L1TxType,
    /// The sender, or the index of the account the transaction creates.
    pub from_idx: Idx,
    pub to_idx: Idx,
    pub token_id: TokenId,
    /// Load amount credited to the sender.
    pub load_amount: U256,
    /// Amount moved from the sender to the receiver or the exit tree.
    pub amount: U256,
    pub mismatches: Mismatches,
    /// Amounts forced to zero, by a mismatch or by a shortfall.
    pub nullify: Nullify,
    /// A force exit asked for more than the balance and exits all of it.
    pub capped: bool,
    /// The account created by this transaction, before the load is credited.
    pub new_account: Option<Account>,
}

pub(crate) fn fits_balance(x: U256) -> bool {
    x.bits() <= BALANCE_BITS
}

/// Resolves `tx` against `store`. New accounts must fit below `max_idx`.
///
/// Errors are reserved for transactions that cannot take part in a batch at
/// all: malformed shapes, reserved or unknown senders, a full tree. Every
/// other problem nullifies amounts instead.
pub fn interpret<A, S>(
    tx: &L1Tx,
    store: &A,
    scheme: &S,
    max_idx: Idx,
) -> Result<EffectiveL1Tx, TxRejection>
where
    A: AccountStore + ?Sized,
    S: SignatureScheme + ?Sized,
{
    let tx_type = tx.tx_type()?;
    let checks = tx_type.checks();

    let (sender, new_account) = if checks.new_account {
        let idx = store.next_free_index();
        if idx > max_idx {
            return Err(TxRejection::TreeFull { max_idx });
        }
        let account = Account::new(
            idx,
            tx.token_id,
            tx.from_bjj,
            expand_or_identity(scheme, &tx.from_bjj),
            tx.from_eth_addr,
        );
        (account.clone(), Some(account))
    } else {
        let account = store
            .get(tx.from_idx)
            .ok_or(TxRejection::UnknownAccount(tx.from_idx))?;
        (account.clone(), None)
    };

    let mismatches = Mismatches {
        token_from: checks.check_token_from && sender.token_id != tx.token_id,
        eth_addr: checks.check_eth_addr && sender.eth_addr != tx.from_eth_addr,
        token_to: checks.check_token_to
            && store
                .get(tx.to_idx)
                .map_or(true, |to| to.token_id != tx.token_id),
    };
    let mut nullify = Nullify::from_mismatches(mismatches);
    nullify.load_amount &= checks.is_load;
    nullify.amount &= checks.is_amount;

    let load_amount = if checks.is_load && !nullify.load_amount {
        tx.load_amount_f.to_fix()
    } else {
        U256::zero()
    };
    let loaded = sender
        .balance
        .checked_add(load_amount)
        .filter(|b| fits_balance(*b))
        .ok_or(TxRejection::BalanceOverflow(sender.idx))?;

    let mut capped = false;
    let amount = if checks.is_amount && !nullify.amount {
        let rule = Shortfall::for_type(tx_type);
        let (amount, short) = rule.settle(loaded, tx.amount_f.to_fix());
        match (short, rule) {
            (true, Shortfall::Cap) => capped = true,
            (true, Shortfall::Nullify) => nullify.amount = true,
            _ => {}
        }
        amount
    } else {
        U256::zero()
    };

    debug!(
        "L1 {tx_type:?} from {} to {}: load {load_amount}, amount {amount}, {mismatches:?}, {nullify:?}, capped: {capped}",
        sender.idx, tx.to_idx
    );

    Ok(EffectiveL1Tx {
        tx_type,
        from_idx: sender.idx,
        to_idx: tx.to_idx,
        token_id: tx.token_id,
        load_amount,
        amount,
        mismatches,
        nullify,
        capped,
        new_account,
    })
}
