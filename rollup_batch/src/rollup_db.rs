//! The committed rollup state and the single point where batches are
//! consolidated into it.

use std::collections::BTreeMap;
use std::sync::Arc;

use ethereum_types::{Address, U256};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;

use crate::account::{Account, Idx, TokenId};
use crate::batch::{Batch, BatchBuilder};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::signature::SignatureScheme;
use crate::store::{AccountProof, AccountStore, ExitStore, SmtAccountStore, SmtExitStore};

/// An exit leaf with the proof that it is part of a batch's exit root.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    pub batch_num: u64,
    pub exit_root: U256,
    pub proof: AccountProof,
}

/// Committed account state, its root history and the exit tree of every
/// consolidated batch.
#[derive(Debug)]
pub struct RollupDb {
    state: SmtAccountStore,
    chain_id: u16,
    /// Number of consolidated batches.
    batch_num: u64,
    /// State root after each batch, starting with the genesis root.
    state_roots: Vec<U256>,
    exit_trees: BTreeMap<u64, SmtExitStore>,
}

impl RollupDb {
    pub fn new(chain_id: u16) -> Self {
        Self::with_state(chain_id, SmtAccountStore::new())
    }

    /// Starts from an existing account state as batch 0.
    pub fn with_state(chain_id: u16, state: SmtAccountStore) -> Self {
        Self {
            state_roots: vec![state.root()],
            state,
            chain_id,
            batch_num: 0,
            exit_trees: BTreeMap::new(),
        }
    }

    pub fn chain_id(&self) -> u16 {
        self.chain_id
    }

    pub fn batch_num(&self) -> u64 {
        self.batch_num
    }

    pub fn state_root(&self) -> U256 {
        self.state.root()
    }

    pub fn last_idx(&self) -> Idx {
        self.state.last_idx()
    }

    pub fn state(&self) -> &SmtAccountStore {
        &self.state
    }

    pub fn get_account(&self, idx: Idx) -> Option<&Account> {
        self.state.get(idx)
    }

    /// Accounts `eth_addr` owns in `token_id`, oldest first.
    pub fn accounts_of(&self, eth_addr: Address, token_id: TokenId) -> Vec<&Account> {
        self.state
            .accounts_of(eth_addr, token_id)
            .iter()
            .filter_map(|&idx| self.state.get(idx))
            .collect()
    }

    /// Starts a batch on a snapshot of the committed state. The batch uses
    /// this rollup's chain id whatever `config` says.
    pub fn build_batch<S: SignatureScheme>(
        &self,
        config: BatchConfig,
        scheme: S,
    ) -> BatchResult<BatchBuilder<S>> {
        let config = BatchConfig {
            chain_id: self.chain_id,
            ..config
        };
        BatchBuilder::new(config, self.state.clone(), scheme)
    }

    /// Commits `batch`. It must have been built on the current state.
    pub fn consolidate(&mut self, batch: Batch) -> BatchResult<u64> {
        if batch.old_state_root() != self.state.root() || batch.old_last_idx() != self.last_idx()
        {
            return Err(BatchError::StaleRoot {
                expected: batch.old_state_root(),
                found: self.state.root(),
            });
        }

        let transition = batch.into_transition();
        self.batch_num += 1;
        self.state = transition.state;
        self.state_roots.push(transition.new_root);
        self.exit_trees.insert(self.batch_num, transition.exits);
        info!(
            "consolidated batch {}: state root {:#x}, last index {}",
            self.batch_num, transition.new_root, transition.new_last_idx
        );
        Ok(self.batch_num)
    }

    /// State root right after `batch_num`. Batch 0 is the starting state.
    pub fn state_root_at(&self, batch_num: u64) -> Option<U256> {
        self.state_roots.get(usize::try_from(batch_num).ok()?).copied()
    }

    /// Exit leaf of `idx` in `batch_num` and its proof.
    pub fn exit_info(&self, batch_num: u64, idx: Idx) -> Option<ExitInfo> {
        let exits = self.exit_trees.get(&batch_num)?;
        exits.get(idx)?;
        Some(ExitInfo {
            batch_num,
            exit_root: exits.root(),
            proof: exits.membership_proof(idx),
        })
    }
}

/// A [`RollupDb`] shared between threads. Batches are built under the read
/// lock on their own snapshot, so any number can be built at once.
/// Consolidation takes the write lock, and a batch built on a state that has
/// since moved on is rejected as stale.
#[derive(Clone, Debug)]
pub struct SharedRollupDb {
    inner: Arc<RwLock<RollupDb>>,
}

impl SharedRollupDb {
    pub fn new(db: RollupDb) -> Self {
        Self {
            inner: Arc::new(RwLock::new(db)),
        }
    }

    pub fn build_batch<S: SignatureScheme>(
        &self,
        config: BatchConfig,
        scheme: S,
    ) -> BatchResult<BatchBuilder<S>> {
        self.inner.read().build_batch(config, scheme)
    }

    pub fn consolidate(&self, batch: Batch) -> BatchResult<u64> {
        self.inner.write().consolidate(batch)
    }

    pub fn state_root(&self) -> U256 {
        self.inner.read().state_root()
    }

    pub fn batch_num(&self) -> u64 {
        self.inner.read().batch_num()
    }

    pub fn state_root_at(&self, batch_num: u64) -> Option<U256> {
        self.inner.read().state_root_at(batch_num)
    }

    pub fn exit_info(&self, batch_num: u64, idx: Idx) -> Option<ExitInfo> {
        self.inner.read().exit_info(batch_num, idx)
    }

    pub fn get_account(&self, idx: Idx) -> Option<Account> {
        self.inner.read().get_account(idx).cloned()
    }

    pub fn accounts_of(&self, eth_addr: Address, token_id: TokenId) -> Vec<Account> {
        self.inner
            .read()
            .accounts_of(eth_addr, token_id)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl From<RollupDb> for SharedRollupDb {
    fn from(db: RollupDb) -> Self {
        Self::new(db)
    }
}
