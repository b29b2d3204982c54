use ethereum_types::U256;
use thiserror::Error;

use crate::account::{Idx, TokenId};
use crate::config::ConfigError;
use crate::engine::Stage;
use crate::float16::Float16Error;

/// Stores the result of batch operations. Returns a [BatchError] upon
/// failure.
pub type BatchResult<T> = Result<T, BatchError>;

/// Why a single transaction cannot take part in a batch at all.
///
/// This is distinct from nullification: a nullified transaction stays in the
/// batch with a zero amount, a rejected one is never applied.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TxRejection {
    #[error("shape matches no L1 transaction type (fromIdx: {from_idx}, toIdx: {to_idx}, loadAmountF: {load_amount_f:#06x}, amountF: {amount_f:#06x})")]
    MalformedL1 {
        from_idx: Idx,
        to_idx: Idx,
        load_amount_f: u16,
        amount_f: u16,
    },

    #[error("index {0} is reserved")]
    ReservedIndex(Idx),

    #[error("account {0} does not exist")]
    UnknownAccount(Idx),

    #[error("L2 destination must be an account or the exit index (toIdx: {0})")]
    InvalidL2Destination(Idx),

    #[error("token {tx} does not match token {account} of account {idx}")]
    TokenMismatch {
        idx: Idx,
        account: TokenId,
        tx: TokenId,
    },

    #[error("amount {0} is not representable as a Float16")]
    AmountNotFloat16(U256),

    #[error("signature does not verify against the key of account {0}")]
    BadSignature(Idx),

    #[error("nonce {got} does not match nonce {expected} of account {idx}")]
    BadNonce { idx: Idx, expected: u64, got: u64 },

    #[error("account {idx} holds {balance} but needs {needed}")]
    InsufficientBalance {
        idx: Idx,
        balance: U256,
        needed: U256,
    },

    #[error("balance of account {0} would not fit in the balance field")]
    BalanceOverflow(Idx),

    #[error("nonce of account {0} would not fit in the nonce field")]
    NonceOverflow(Idx),

    #[error("account tree is full: no free index up to {max_idx}")]
    TreeFull { max_idx: Idx },

    #[error(transparent)]
    Float16(#[from] Float16Error),
}

/// An error that aborts the construction or consolidation of a whole batch.
/// The caller discards the batch; committed state is untouched.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BatchError {
    #[error("L1 transaction in slot {slot} rejected: {reason}")]
    L1Rejected { slot: usize, reason: TxRejection },

    #[error("L2 transaction in slot {slot} rejected: {reason}")]
    L2Rejected { slot: usize, reason: TxRejection },

    #[error("batch takes at most {max} L1 transactions")]
    TooManyL1Txs { max: usize },

    #[error("batch takes at most {max} transactions")]
    TooManyTxs { max: usize },

    #[error("batch takes at most {max} fee accounts (got: {got})")]
    TooManyFeeIdxs { max: usize, got: usize },

    #[error("fee slot {slot} points to account {idx}, which does not exist")]
    FeeAccountMissing { slot: usize, idx: Idx },

    #[error("batch was built on state root {expected:#x} but the state is at {found:#x}")]
    StaleRoot { expected: U256, found: U256 },

    #[error("{field} value {value:#x} does not fit in {width} bits")]
    FieldOverflow {
        field: &'static str,
        value: U256,
        width: usize,
    },

    #[error("cannot {action} while the batch is {stage:?}")]
    InvalidStage { action: &'static str, stage: Stage },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Float16(#[from] Float16Error),
}
