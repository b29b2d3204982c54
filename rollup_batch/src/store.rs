//! Index-keyed account storage backed by [`smt_trie`].
//!
//! The state tree holds one leaf per account, the exit tree one leaf per
//! account that exited during a batch. Both keep the full account next to
//! the tree, which only commits to [`Account::state_hash`].

use std::collections::{BTreeMap, HashMap};

use ethereum_types::{Address, U256};
use log::trace;
use serde::Serialize;
use smt_trie::db::MemoryDb;
use smt_trie::keys::key_index;
use smt_trie::smt::{Smt, SmtProof};
use smt_trie::utils::{hashout2u, u2hashout};

use crate::account::{Account, Idx, TokenId};
use crate::constants::INITIAL_LAST_IDX;

type SmtTree = Smt<MemoryDb>;

/// Inclusion proof of an account leaf, together with the leaf it proves.
#[derive(Clone, Debug, Serialize)]
pub struct AccountProof {
    pub account: Option<Account>,
    pub proof: SmtProof,
}

impl AccountProof {
    /// Checks the proof against `root`. Absent accounts never verify.
    pub fn verify(&self, root: U256) -> bool {
        let Some(account) = &self.account else {
            return false;
        };
        self.proof
            .verify(u2hashout(root), key_index(account.idx), account.state_hash())
    }
}

/// Account state a batch reads from and writes to.
pub trait AccountStore {
    fn get(&self, idx: Idx) -> Option<&Account>;

    /// Inserts or replaces the account stored at `account.idx`.
    fn put(&mut self, account: Account);

    /// Index the next created account receives.
    fn next_free_index(&self) -> Idx {
        self.last_idx() + 1
    }

    /// Highest index assigned so far.
    fn last_idx(&self) -> Idx;

    fn root(&self) -> U256;

    fn membership_proof(&self, idx: Idx) -> AccountProof;
}

/// Exit leaves of one batch.
pub trait ExitStore {
    /// Adds `amount` to the exit leaf of `account` and returns the leaf's new
    /// total. The leaf is written even when the total stays zero.
    fn append(&mut self, account: &Account, amount: U256) -> U256;

    fn get(&self, idx: Idx) -> Option<&Account>;

    fn root(&self) -> U256;

    fn membership_proof(&self, idx: Idx) -> AccountProof;
}

/// The account tree plus the accounts it commits to.
///
/// Cloning yields an independent snapshot: batches are built on a clone and
/// the clone replaces the committed store when the batch is consolidated.
#[derive(Clone, Debug)]
pub struct SmtAccountStore {
    tree: SmtTree,
    accounts: BTreeMap<Idx, Account>,
    owners: HashMap<(Address, TokenId), Vec<Idx>>,
    last_idx: Idx,
}

impl Default for SmtAccountStore {
    fn default() -> Self {
        Self {
            tree: SmtTree::default(),
            accounts: BTreeMap::new(),
            owners: HashMap::new(),
            last_idx: INITIAL_LAST_IDX,
        }
    }
}

impl SmtAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the accounts created for `eth_addr` in `token_id`, oldest
    /// first.
    pub fn accounts_of(&self, eth_addr: Address, token_id: TokenId) -> &[Idx] {
        self.owners
            .get(&(eth_addr, token_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for SmtAccountStore {
    fn get(&self, idx: Idx) -> Option<&Account> {
        self.accounts.get(&idx)
    }

    fn put(&mut self, account: Account) {
        let idx = account.idx;
        trace!("state tree: put account {idx}");
        self.tree.set(key_index(idx), account.state_hash());
        if self.accounts.insert(idx, account.clone()).is_none() {
            self.owners
                .entry((account.eth_addr, account.token_id))
                .or_default()
                .push(idx);
        }
        self.last_idx = self.last_idx.max(idx);
    }

    fn last_idx(&self) -> Idx {
        self.last_idx
    }

    fn root(&self) -> U256 {
        hashout2u(self.tree.root)
    }

    fn membership_proof(&self, idx: Idx) -> AccountProof {
        AccountProof {
            account: self.accounts.get(&idx).cloned(),
            proof: self.tree.proof(key_index(idx)),
        }
    }
}

/// The exit tree of one batch.
#[derive(Clone, Debug, Default)]
pub struct SmtExitStore {
    tree: SmtTree,
    exits: BTreeMap<Idx, Account>,
}

impl SmtExitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.exits.values()
    }

    pub fn len(&self) -> usize {
        self.exits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }
}

impl ExitStore for SmtExitStore {
    fn append(&mut self, account: &Account, amount: U256) -> U256 {
        let leaf = self.exits.entry(account.idx).or_insert_with(|| Account {
            nonce: 0,
            balance: U256::zero(),
            ..account.clone()
        });
        leaf.balance += amount;
        let total = leaf.balance;
        trace!("exit tree: account {} exits {total} in total", account.idx);
        self.tree.set(key_index(account.idx), leaf.state_hash());
        total
    }

    fn get(&self, idx: Idx) -> Option<&Account> {
        self.exits.get(&idx)
    }

    fn root(&self) -> U256 {
        hashout2u(self.tree.root)
    }

    fn membership_proof(&self, idx: Idx) -> AccountProof {
        AccountProof {
            account: self.exits.get(&idx).cloned(),
            proof: self.tree.proof(key_index(idx)),
        }
    }
}
