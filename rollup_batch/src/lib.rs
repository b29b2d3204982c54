//! Batch construction for an account-based zk-rollup.
//!
//! A batch applies transactions forced from the base chain ([`tx::L1Tx`])
//! followed by signed off-chain transfers ([`tx::L2Tx`]) to an account tree,
//! credits the collected fees, and commits the result to a single field
//! element that the batch proof exposes as its public input.
//!
//! The pieces, in the order a batch goes through them:
//! - [`l1`] and [`l2`] interpret one transaction against the current state.
//!   L1 transactions can never be refused by the sequencer, so a mismatch
//!   between a transaction and the state nullifies its amounts
//!   ([`nullify`]) instead of dropping it.
//! - [`engine::StateTransition`] applies them in order and records one
//!   [`engine::TxWitness`] per slot.
//! - [`fee_distributor`] pays the per-token fee totals to the batch's fee
//!   accounts.
//! - [`public_inputs`] packs roots, transaction data and fee indices into the
//!   bit string whose SHA-256 hash the proof commits to.
//! - [`batch::BatchBuilder`] drives all of the above, and [`rollup_db`] holds
//!   the committed state that batches are built on and consolidated into.

pub mod account;
pub mod batch;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fee;
pub mod fee_distributor;
pub mod float16;
pub mod l1;
pub mod l2;
pub mod nullify;
pub mod public_inputs;
pub mod rollup_db;
pub mod signature;
pub mod store;
pub mod tx;

pub use batch::{Batch, BatchBuilder};
pub use config::BatchConfig;
pub use error::{BatchError, BatchResult, TxRejection};
pub use rollup_db::{RollupDb, SharedRollupDb};
