//! The per-batch state machine that applies interpreted transactions to the
//! account and exit trees.
//!
//! A batch moves through [`Stage::Empty`], [`Stage::Accumulating`] while
//! transactions are applied (every L1 transaction before any L2 one),
//! [`Stage::FeeApplied`] once fees are paid out and [`Stage::Finalized`].
//! The engine works on its own copy of the account store: an error leaves
//! that copy half-applied and the caller drops it.

use ethereum_types::U256;
use log::{debug, info};
use serde::Serialize;

use crate::account::{Account, Idx};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult, TxRejection};
use crate::fee_distributor::{FeeAccumulator, FeeCredit};
use crate::float16::Float16;
use crate::l1::{self, fits_balance, EffectiveL1Tx};
use crate::l2::{self, EffectiveL2Tx};
use crate::signature::SignatureScheme;
use crate::store::{AccountStore, ExitStore, SmtAccountStore, SmtExitStore};
use crate::tx::{L1Tx, L2Tx};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Stage {
    Empty,
    Accumulating,
    FeeApplied,
    Finalized,
}

/// What the prover needs to know about one transaction slot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "camelCase")]
pub enum TxWitness {
    #[serde(rename_all = "camelCase")]
    L1 {
        slot: usize,
        tx: L1Tx,
        effective: EffectiveL1Tx,
        /// Total of the sender's exit leaf after a force exit.
        exit_balance: Option<U256>,
        state_root: U256,
    },
    #[serde(rename_all = "camelCase")]
    L2 {
        slot: usize,
        tx: L2Tx,
        effective: EffectiveL2Tx,
        exit_balance: Option<U256>,
        state_root: U256,
    },
    /// An unused slot. It changes nothing but is still encoded.
    Padding { slot: usize },
}

/// The fields a slot contributes to the L2 data availability stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SlotData {
    pub from_idx: Idx,
    pub to_idx: Idx,
    pub amount_f: Float16,
    pub fee: u8,
}

impl TxWitness {
    pub fn slot(&self) -> usize {
        match self {
            Self::L1 { slot, .. } | Self::L2 { slot, .. } | Self::Padding { slot } => *slot,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(self, Self::Padding { .. })
    }

    /// Effective values of the slot as posted on chain. L1 amounts that were
    /// capped are floored to the nearest encodable amount.
    pub fn slot_data(&self) -> BatchResult<SlotData> {
        Ok(match self {
            Self::L1 { effective, .. } => SlotData {
                from_idx: effective.from_idx,
                to_idx: effective.to_idx,
                amount_f: Float16::floor_from(effective.amount)?,
                fee: 0,
            },
            Self::L2 { effective, .. } => SlotData {
                from_idx: effective.from_idx,
                to_idx: effective.to_idx,
                amount_f: effective.amount_f,
                fee: effective.fee_selector,
            },
            Self::Padding { .. } => SlotData::default(),
        })
    }
}

/// Applies the transactions of one batch.
pub struct StateTransition<S, A = SmtAccountStore, E = SmtExitStore> {
    config: BatchConfig,
    scheme: S,
    state: A,
    exits: E,
    stage: Stage,
    old_root: U256,
    old_last_idx: Idx,
    l1_count: usize,
    l2_count: usize,
    fees: FeeAccumulator,
    fee_idxs: Vec<Idx>,
    fee_credits: Vec<FeeCredit>,
    witnesses: Vec<TxWitness>,
}

/// Everything a finalized batch produced.
#[derive(Debug)]
pub struct Transition<A = SmtAccountStore, E = SmtExitStore> {
    pub old_root: U256,
    pub new_root: U256,
    pub exit_root: U256,
    pub old_last_idx: Idx,
    pub new_last_idx: Idx,
    pub fees: FeeAccumulator,
    pub fee_idxs: Vec<Idx>,
    pub fee_credits: Vec<FeeCredit>,
    /// One per slot, padding included.
    pub witnesses: Vec<TxWitness>,
    pub state: A,
    pub exits: E,
}

impl<S, A, E> StateTransition<S, A, E>
where
    S: SignatureScheme,
    A: AccountStore,
    E: ExitStore + Default,
{
    /// Starts a batch on `state`, which the engine then owns.
    pub fn new(config: BatchConfig, state: A, scheme: S) -> BatchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheme,
            old_root: state.root(),
            old_last_idx: state.last_idx(),
            state,
            exits: E::default(),
            stage: Stage::Empty,
            l1_count: 0,
            l2_count: 0,
            fees: FeeAccumulator::default(),
            fee_idxs: vec![],
            fee_credits: vec![],
            witnesses: vec![],
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn exits(&self) -> &E {
        &self.exits
    }

    pub fn witnesses(&self) -> &[TxWitness] {
        &self.witnesses
    }

    fn accumulate(&mut self, action: &'static str) -> BatchResult<()> {
        match self.stage {
            Stage::Empty | Stage::Accumulating => {
                self.stage = Stage::Accumulating;
                Ok(())
            }
            stage => Err(BatchError::InvalidStage { action, stage }),
        }
    }

    fn check_capacity(&self) -> BatchResult<()> {
        if self.l1_count + self.l2_count >= self.config.n_tx {
            return Err(BatchError::TooManyTxs {
                max: self.config.n_tx,
            });
        }
        Ok(())
    }

    fn account(&self, idx: Idx) -> Result<Account, TxRejection> {
        self.state
            .get(idx)
            .cloned()
            .ok_or(TxRejection::UnknownAccount(idx))
    }

    /// Moves `amount` from `from` to the account at `to_idx` and stores
    /// both. A transfer to oneself only stores `from`.
    fn transfer(&mut self, mut from: Account, to_idx: Idx, amount: U256) -> Result<(), TxRejection> {
        if to_idx == from.idx || amount.is_zero() {
            self.state.put(from);
            return Ok(());
        }
        let mut to = self.account(to_idx)?;
        to.balance = to
            .balance
            .checked_add(amount)
            .filter(|b| fits_balance(*b))
            .ok_or(TxRejection::BalanceOverflow(to_idx))?;
        from.balance -= amount;
        self.state.put(from);
        self.state.put(to);
        Ok(())
    }

    /// Applies the next L1 transaction.
    pub fn apply_l1(&mut self, tx: &L1Tx) -> BatchResult<&TxWitness> {
        self.accumulate("apply an L1 transaction")?;
        if self.l2_count > 0 {
            return Err(BatchError::InvalidStage {
                action: "apply an L1 transaction after an L2 one",
                stage: self.stage,
            });
        }
        if self.l1_count >= self.config.max_l1_tx {
            return Err(BatchError::TooManyL1Txs {
                max: self.config.max_l1_tx,
            });
        }
        self.check_capacity()?;

        let slot = self.l1_count;
        let reject = |reason| BatchError::L1Rejected { slot, reason };
        let effective =
            l1::interpret(tx, &self.state, &self.scheme, self.config.max_idx()).map_err(reject)?;

        let mut sender = match &effective.new_account {
            Some(account) => account.clone(),
            None => self.account(effective.from_idx).map_err(reject)?,
        };
        sender.balance += effective.load_amount;

        let exit_balance = if effective.tx_type.is_exit() {
            sender.balance -= effective.amount;
            self.state.put(sender.clone());
            Some(self.exits.append(&sender, effective.amount))
        } else {
            self.transfer(sender, effective.to_idx, effective.amount)
                .map_err(reject)?;
            None
        };

        self.l1_count += 1;
        self.witnesses.push(TxWitness::L1 {
            slot: self.witnesses.len(),
            tx: tx.clone(),
            effective,
            exit_balance,
            state_root: self.state.root(),
        });
        Ok(self.last_witness())
    }

    /// Applies the next L2 transaction.
    pub fn apply_l2(&mut self, tx: &L2Tx) -> BatchResult<&TxWitness> {
        self.accumulate("apply an L2 transaction")?;
        self.check_capacity()?;

        let slot = self.l2_count;
        let reject = |reason| BatchError::L2Rejected { slot, reason };
        let effective =
            l2::interpret(tx, &self.state, &self.scheme, self.config.chain_id).map_err(reject)?;

        let mut sender = self.account(effective.from_idx).map_err(reject)?;
        sender.balance -= effective.fee;
        sender.nonce += 1;
        self.fees.add(effective.token_id, effective.fee);

        let exit_balance = if effective.is_exit() {
            sender.balance -= effective.amount;
            self.state.put(sender.clone());
            Some(self.exits.append(&sender, effective.amount))
        } else {
            self.transfer(sender, effective.to_idx, effective.amount)
                .map_err(reject)?;
            None
        };

        self.l2_count += 1;
        self.witnesses.push(TxWitness::L2 {
            slot: self.witnesses.len(),
            tx: tx.clone(),
            effective,
            exit_balance,
            state_root: self.state.root(),
        });
        Ok(self.last_witness())
    }

    fn last_witness(&self) -> &TxWitness {
        &self.witnesses[self.witnesses.len() - 1]
    }

    /// Pays the collected fees to the accounts in `fee_idxs`.
    pub fn distribute_fees(&mut self, fee_idxs: &[Idx]) -> BatchResult<&[FeeCredit]> {
        match self.stage {
            Stage::Empty | Stage::Accumulating => {}
            stage => {
                return Err(BatchError::InvalidStage {
                    action: "distribute fees",
                    stage,
                })
            }
        }
        if fee_idxs.len() > self.config.max_fee_tx {
            return Err(BatchError::TooManyFeeIdxs {
                max: self.config.max_fee_tx,
                got: fee_idxs.len(),
            });
        }
        self.fee_credits = self.fees.distribute(fee_idxs, &mut self.state)?;
        self.fee_idxs = fee_idxs.to_vec();
        self.stage = Stage::FeeApplied;
        Ok(&self.fee_credits)
    }

    /// Pads the remaining slots and closes the batch.
    pub fn finalize(&mut self) -> BatchResult<()> {
        if self.stage != Stage::FeeApplied {
            return Err(BatchError::InvalidStage {
                action: "finalize",
                stage: self.stage,
            });
        }
        while self.witnesses.len() < self.config.n_tx {
            self.witnesses.push(TxWitness::Padding {
                slot: self.witnesses.len(),
            });
        }
        self.stage = Stage::Finalized;
        info!(
            "batch finalized: {} L1 and {} L2 transactions, last index {} -> {}, state root {:#x} -> {:#x}, exit root {:#x}",
            self.l1_count,
            self.l2_count,
            self.old_last_idx,
            self.state.last_idx(),
            self.old_root,
            self.state.root(),
            self.exits.root(),
        );
        Ok(())
    }

    /// Hands out the result of a finalized batch.
    pub fn into_transition(self) -> BatchResult<Transition<A, E>> {
        if self.stage != Stage::Finalized {
            return Err(BatchError::InvalidStage {
                action: "take the result of",
                stage: self.stage,
            });
        }
        debug!("batch collected fees: {:?}", self.fees.totals());
        Ok(Transition {
            old_root: self.old_root,
            new_root: self.state.root(),
            exit_root: self.exits.root(),
            old_last_idx: self.old_last_idx,
            new_last_idx: self.state.last_idx(),
            fees: self.fees,
            fee_idxs: self.fee_idxs,
            fee_credits: self.fee_credits,
            witnesses: self.witnesses,
            state: self.state,
            exits: self.exits,
        })
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::Address;

    use super::*;
    use crate::account::{BjjCompressed, PublicKey};
    use crate::constants::EXIT_IDX;
    use crate::signature::{l2_message, Signature};

    struct EchoScheme;

    impl SignatureScheme for EchoScheme {
        fn decompress(&self, bjj: &BjjCompressed) -> Option<PublicKey> {
            Some(PublicKey {
                ax: U256::zero(),
                ay: bjj.0,
            })
        }

        fn verify(&self, _: &PublicKey, msg: U256, signature: &Signature) -> bool {
            signature.s == msg
        }
    }

    fn config() -> BatchConfig {
        BatchConfig::new(4, 16, 2, 2, 0).unwrap()
    }

    fn engine() -> StateTransition<EchoScheme> {
        StateTransition::new(config(), SmtAccountStore::new(), EchoScheme).unwrap()
    }

    fn fix(x: u64) -> Float16 {
        Float16::exact_from(U256::from(x)).unwrap()
    }

    fn create(load: u64) -> L1Tx {
        L1Tx {
            load_amount_f: fix(load),
            token_id: 1,
            from_bjj: BjjCompressed(U256::from(5)),
            from_eth_addr: Address::repeat_byte(1),
            ..Default::default()
        }
    }

    fn l2(from_idx: Idx, to_idx: Idx, amount: u64, fee: u8, nonce: u64) -> L2Tx {
        let mut tx = L2Tx {
            from_idx,
            to_idx,
            token_id: 1,
            amount: U256::from(amount),
            fee,
            nonce,
            ..Default::default()
        };
        tx.signature.s = l2_message(&tx, 0).unwrap();
        tx
    }

    fn balance(engine: &StateTransition<EchoScheme>, idx: Idx) -> U256 {
        engine.state().get(idx).unwrap().balance
    }

    #[test]
    fn stages_advance_in_order() {
        let mut engine = engine();
        assert_eq!(engine.stage(), Stage::Empty);
        engine.apply_l1(&create(100)).unwrap();
        assert_eq!(engine.stage(), Stage::Accumulating);
        assert!(matches!(
            engine.finalize(),
            Err(BatchError::InvalidStage {
                stage: Stage::Accumulating,
                ..
            })
        ));
        engine.distribute_fees(&[]).unwrap();
        assert_eq!(engine.stage(), Stage::FeeApplied);
        assert!(matches!(
            engine.apply_l1(&create(100)),
            Err(BatchError::InvalidStage {
                stage: Stage::FeeApplied,
                ..
            })
        ));
        engine.finalize().unwrap();

        let t = engine.into_transition().unwrap();
        assert_eq!(t.witnesses.len(), 4);
        assert!(t.witnesses[1..].iter().all(TxWitness::is_padding));
        assert_eq!(t.old_last_idx, 255);
        assert_eq!(t.new_last_idx, 256);
    }

    #[test]
    fn l1_after_l2_is_refused() {
        let mut engine = engine();
        engine.apply_l1(&create(100)).unwrap();
        engine.apply_l2(&l2(256, 256, 10, 0, 0)).unwrap();
        assert!(matches!(
            engine.apply_l1(&create(100)),
            Err(BatchError::InvalidStage { .. })
        ));
    }

    #[test]
    fn capacities_are_enforced() {
        let mut engine = engine();
        engine.apply_l1(&create(100)).unwrap();
        engine.apply_l1(&create(100)).unwrap();
        assert_eq!(
            engine.apply_l1(&create(100)).unwrap_err(),
            BatchError::TooManyL1Txs { max: 2 }
        );
        engine.apply_l2(&l2(256, 257, 10, 0, 0)).unwrap();
        engine.apply_l2(&l2(256, 257, 10, 0, 1)).unwrap();
        assert_eq!(
            engine.apply_l2(&l2(256, 257, 10, 0, 2)).unwrap_err(),
            BatchError::TooManyTxs { max: 4 }
        );
        assert_eq!(
            engine.distribute_fees(&[0, 0, 0]).unwrap_err(),
            BatchError::TooManyFeeIdxs { max: 2, got: 3 }
        );
    }

    #[test]
    fn same_owner_gets_sequential_indices() {
        let mut engine = engine();
        engine.apply_l1(&create(100)).unwrap();
        engine.apply_l1(&create(100)).unwrap();
        assert_eq!(balance(&engine, 256), U256::from(100));
        assert_eq!(balance(&engine, 257), U256::from(100));
    }

    #[test]
    fn l2_moves_amount_and_fee() {
        let mut engine = engine();
        engine.apply_l1(&create(1000)).unwrap();
        engine.apply_l1(&create(0)).unwrap();
        // Fee of 49 at selector 200.
        engine.apply_l2(&l2(256, 257, 500, 200, 0)).unwrap();
        assert_eq!(balance(&engine, 256), U256::from(451));
        assert_eq!(balance(&engine, 257), U256::from(500));
        assert_eq!(engine.state().get(256).unwrap().nonce, 1);

        let credits = engine.distribute_fees(&[257]).unwrap().to_vec();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].amount, U256::from(49));
        assert_eq!(balance(&engine, 257), U256::from(549));
    }

    #[test]
    fn exits_accumulate_within_the_batch() {
        let mut engine = engine();
        engine.apply_l1(&create(1000)).unwrap();
        let w = engine.apply_l2(&l2(256, EXIT_IDX, 300, 0, 0)).unwrap().clone();
        assert!(matches!(
            w,
            TxWitness::L2 {
                exit_balance: Some(b),
                ..
            } if b == U256::from(300)
        ));
        engine.apply_l2(&l2(256, EXIT_IDX, 200, 0, 1)).unwrap();
        assert_eq!(engine.exits().get(256).unwrap().balance, U256::from(500));
        assert_eq!(balance(&engine, 256), U256::from(500));
    }

    #[test]
    fn rejected_l2_reports_its_slot() {
        let mut engine = engine();
        engine.apply_l1(&create(1000)).unwrap();
        engine.apply_l2(&l2(256, 256, 10, 0, 0)).unwrap();
        assert_eq!(
            engine.apply_l2(&l2(256, 256, 10, 0, 0)).unwrap_err(),
            BatchError::L2Rejected {
                slot: 1,
                reason: TxRejection::BadNonce {
                    idx: 256,
                    expected: 1,
                    got: 0
                }
            }
        );
    }

    #[test]
    fn slot_data_floors_l1_amounts() {
        let w = TxWitness::L1 {
            slot: 0,
            tx: L1Tx::default(),
            effective: EffectiveL1Tx {
                tx_type: crate::tx::L1TxType::ForceExit,
                from_idx: 256,
                to_idx: EXIT_IDX,
                token_id: 1,
                load_amount: U256::zero(),
                amount: U256::from(10_239),
                mismatches: Default::default(),
                nullify: Default::default(),
                capped: true,
                new_account: None,
            },
            exit_balance: Some(U256::from(10_239)),
            state_root: U256::zero(),
        };
        let data = w.slot_data().unwrap();
        assert_eq!(data.amount_f.to_fix(), U256::from(10_235));
        assert_eq!(data.to_idx, EXIT_IDX);
        assert_eq!(TxWitness::Padding { slot: 3 }.slot_data().unwrap(), SlotData::default());
    }
}
