//! Assembly of one batch, from collected transactions to the hash its proof
//! exposes.

use ethereum_types::U256;
use log::info;

use crate::account::Idx;
use crate::config::BatchConfig;
use crate::engine::{StateTransition, Transition, TxWitness};
use crate::error::{BatchError, BatchResult};
use crate::fee_distributor::{FeeAccumulator, FeeCredit};
use crate::public_inputs::PublicInputs;
use crate::signature::SignatureScheme;
use crate::store::{AccountStore, SmtAccountStore, SmtExitStore};
use crate::tx::{L1Tx, L2Tx, Tx};

/// Collects the transactions of a batch on top of a snapshot of the account
/// state.
pub struct BatchBuilder<S, A = SmtAccountStore> {
    config: BatchConfig,
    state: A,
    scheme: S,
    l1_txs: Vec<L1Tx>,
    l2_txs: Vec<L2Tx>,
    fee_idxs: Vec<Idx>,
}

impl<S, A> BatchBuilder<S, A>
where
    S: SignatureScheme,
    A: AccountStore,
{
    pub fn new(config: BatchConfig, state: A, scheme: S) -> BatchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            scheme,
            l1_txs: vec![],
            l2_txs: vec![],
            fee_idxs: vec![],
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    fn check_total(&self) -> BatchResult<()> {
        if self.l1_txs.len() + self.l2_txs.len() >= self.config.n_tx {
            return Err(BatchError::TooManyTxs {
                max: self.config.n_tx,
            });
        }
        Ok(())
    }

    pub fn add_l1_tx(&mut self, tx: L1Tx) -> BatchResult<()> {
        if self.l1_txs.len() >= self.config.max_l1_tx {
            return Err(BatchError::TooManyL1Txs {
                max: self.config.max_l1_tx,
            });
        }
        self.check_total()?;
        self.l1_txs.push(tx);
        Ok(())
    }

    pub fn add_l2_tx(&mut self, tx: L2Tx) -> BatchResult<()> {
        self.check_total()?;
        self.l2_txs.push(tx);
        Ok(())
    }

    /// Adds a transaction of either origin. L1 transactions are applied
    /// before L2 ones whatever the order they are added in.
    pub fn add_tx(&mut self, tx: impl Into<Tx>) -> BatchResult<()> {
        match tx.into() {
            Tx::L1(tx) => self.add_l1_tx(tx),
            Tx::L2(tx) => self.add_l2_tx(tx),
        }
    }

    /// Sets the accounts that receive this batch's fees. Index 0 burns.
    pub fn set_fee_idxs(&mut self, fee_idxs: Vec<Idx>) -> BatchResult<()> {
        if fee_idxs.len() > self.config.max_fee_tx {
            return Err(BatchError::TooManyFeeIdxs {
                max: self.config.max_fee_tx,
                got: fee_idxs.len(),
            });
        }
        self.fee_idxs = fee_idxs;
        Ok(())
    }

    /// Applies every transaction, pays the fees and encodes the result.
    pub fn build(self) -> BatchResult<Batch<A>> {
        let mut engine =
            StateTransition::<S, A, SmtExitStore>::new(self.config, self.state, self.scheme)?;
        for tx in &self.l1_txs {
            engine.apply_l1(tx)?;
        }
        for tx in &self.l2_txs {
            engine.apply_l2(tx)?;
        }
        engine.distribute_fees(&self.fee_idxs)?;
        engine.finalize()?;
        let transition = engine.into_transition()?;

        let public_inputs = PublicInputs::new(
            &self.config,
            transition.old_last_idx,
            transition.new_last_idx,
            transition.old_root,
            transition.new_root,
            transition.exit_root,
            &self.l1_txs,
            &transition.witnesses,
            &transition.fee_idxs,
        )?;
        let hash = public_inputs.hash()?;
        info!(
            "batch built: {} L1 and {} L2 transactions, hash {hash:#x}",
            self.l1_txs.len(),
            self.l2_txs.len()
        );

        Ok(Batch {
            config: self.config,
            l1_txs: self.l1_txs,
            l2_txs: self.l2_txs,
            transition,
            public_inputs,
            hash,
        })
    }
}

/// A finalized batch: its post-state, exit tree and public inputs.
#[derive(Debug)]
pub struct Batch<A = SmtAccountStore> {
    config: BatchConfig,
    l1_txs: Vec<L1Tx>,
    l2_txs: Vec<L2Tx>,
    transition: Transition<A, SmtExitStore>,
    public_inputs: PublicInputs,
    hash: U256,
}

impl<A> Batch<A> {
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn l1_txs(&self) -> &[L1Tx] {
        &self.l1_txs
    }

    pub fn l2_txs(&self) -> &[L2Tx] {
        &self.l2_txs
    }

    pub fn public_inputs(&self) -> &PublicInputs {
        &self.public_inputs
    }

    /// The public-input hash the proof must match.
    pub fn hash_inputs(&self) -> U256 {
        self.hash
    }

    /// One witness per slot, padding included.
    pub fn witnesses(&self) -> &[TxWitness] {
        &self.transition.witnesses
    }

    pub fn fees(&self) -> &FeeAccumulator {
        &self.transition.fees
    }

    pub fn fee_credits(&self) -> &[FeeCredit] {
        &self.transition.fee_credits
    }

    pub fn fee_idxs(&self) -> &[Idx] {
        &self.transition.fee_idxs
    }

    pub fn old_state_root(&self) -> U256 {
        self.transition.old_root
    }

    pub fn new_state_root(&self) -> U256 {
        self.transition.new_root
    }

    pub fn new_exit_root(&self) -> U256 {
        self.transition.exit_root
    }

    pub fn old_last_idx(&self) -> Idx {
        self.transition.old_last_idx
    }

    pub fn new_last_idx(&self) -> Idx {
        self.transition.new_last_idx
    }

    /// State after the batch.
    pub fn state(&self) -> &A {
        &self.transition.state
    }

    pub fn exit_tree(&self) -> &SmtExitStore {
        &self.transition.exits
    }

    pub fn l1_txs_data(&self) -> &[u8] {
        &self.public_inputs.l1_txs_data
    }

    pub fn l2_txs_data(&self) -> &[u8] {
        &self.public_inputs.l2_txs_data
    }

    pub fn fee_txs_data(&self) -> &[u8] {
        &self.public_inputs.fee_txs_data
    }

    pub fn l1_txs_data_hex(&self) -> String {
        self.public_inputs.l1_txs_data_hex()
    }

    pub fn l2_txs_data_hex(&self) -> String {
        self.public_inputs.l2_txs_data_hex()
    }

    pub fn fee_txs_data_hex(&self) -> String {
        self.public_inputs.fee_txs_data_hex()
    }

    pub(crate) fn into_transition(self) -> Transition<A, SmtExitStore> {
        self.transition
    }
}
