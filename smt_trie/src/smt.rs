#![allow(clippy::needless_range_loop)]

use std::collections::HashMap;

use ethereum_types::U256;
use log::trace;
use plonky2::field::goldilocks_field::GoldilocksField;
use plonky2::field::types::{Field, PrimeField64};
use plonky2::hash::poseidon::{Poseidon, PoseidonHash};
use plonky2::plonk::config::Hasher;
use serde::{Deserialize, Serialize};

use crate::bits::Bits;
use crate::db::Db;
use crate::utils::{f2limbs, hash0, hash_key_hash, limbs2f, unique_child};

pub type F = GoldilocksField;
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub [F; 4]);
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node(pub [F; 12]);
pub type Hash = PoseidonHash;
pub type HashOut = <PoseidonHash as Hasher<F>>::Hash;

impl Key {
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(F::is_zero)
    }

    /// The tree path of this key, one bit of each limb per round.
    pub fn split(&self) -> Bits {
        let mut bits = Bits::empty();
        let mut arr: [_; 4] = std::array::from_fn(|i| self.0[i].to_canonical_u64());
        for _ in 0..64 {
            for j in 0..4 {
                bits.push_bit(arr[j] & 1 == 1);
                arr[j] >>= 1;
            }
        }
        bits
    }

    /// Rebuilds a full key from the path walked so far and the remaining key
    /// stored in a leaf.
    pub fn join(bits: Bits, rem_key: Self) -> Self {
        let mut n = [0; 4];
        let mut accs = [0; 4];
        for i in 0..bits.count {
            if bits.get_bit(i) {
                accs[i % 4] |= 1 << n[i % 4];
            }
            n[i % 4] += 1;
        }
        let key = std::array::from_fn(|i| {
            F::from_canonical_u64((rem_key.0[i].to_canonical_u64() << n[i]) | accs[i])
        });
        Key(key)
    }

    /// Drops the first `nbits` path bits, leaving the key stored in a leaf at
    /// depth `nbits`.
    pub(crate) fn remove_key_bits(&self, nbits: usize) -> Self {
        let full_levels = nbits / 4;
        let mut auxk = self.0.map(|x| x.to_canonical_u64());
        for i in 0..4 {
            let mut n = full_levels;
            if full_levels * 4 + i < nbits {
                n += 1;
            }
            auxk[i] >>= n;
        }
        Key(auxk.map(F::from_canonical_u64))
    }
}

/// A stored node. Internal nodes hold their two children's hashes in
/// `[0..4]` and `[4..8]`. Leaves hold the remaining key in `[0..4]`, the
/// value hash in `[4..8]` and a one in `[8]`.
impl Node {
    pub fn is_leaf(&self) -> bool {
        self.0[8].is_one()
    }

    pub fn child(&self, bit: bool) -> [F; 4] {
        let i = bit as usize * 4;
        self.0[i..i + 4].try_into().unwrap()
    }

    pub fn set_child(&mut self, bit: bool, h: [F; 4]) {
        let i = bit as usize * 4;
        self.0[i..i + 4].copy_from_slice(&h);
    }

    pub fn rem_key(&self) -> Key {
        Key(self.child(false))
    }

    pub fn value_hash(&self) -> [F; 4] {
        self.child(true)
    }

    fn hash(&self) -> [F; 4] {
        F::poseidon(self.0)[0..4].try_into().unwrap()
    }
}

fn place(node: &mut [F; 8], bit: bool, h: [F; 4]) {
    let i = bit as usize * 4;
    node[i..i + 4].copy_from_slice(&h);
}

/// Sparse Merkle tree (SMT).
/// Represented as a map from keys to leaves and a map from keys to internal
/// nodes. Leaves hold a value node, the hash of an account in the state tree
/// or of an exit in the exit tree. Internal nodes hold the hashes of their
/// children. The root is the hash of the root node, all zeros when empty.
/// Leaves are hashed with a capacity of `[1,0,0,0]`, internal and value
/// nodes with `[0,0,0,0]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Smt<D: Db> {
    pub db: D,
    pub kv_store: HashMap<Key, U256>,
    pub root: HashOut,
}

impl<D: Db> Smt<D> {
    /// Returns `Poseidon(x, [0,0,0,0])` and save it in DB.
    pub fn hash0(&mut self, x: [F; 8]) -> [F; 4] {
        let h = hash0(x);
        let a = std::array::from_fn(|i| if i < 8 { x[i] } else { F::ZERO });
        self.db.set_node(Key(h), Node(a));
        h
    }

    /// Returns `Poseidon(key || h, [1,0,0,0])` and save it in DB.
    pub fn hash_key_hash(&mut self, k: Key, h: [F; 4]) -> [F; 4] {
        let a = std::array::from_fn(|i| match i {
            j if j < 4 => k.0[j],
            j if j < 8 => h[j - 4],
            8 => F::ONE,
            _ => F::ZERO,
        });
        let h = hash_key_hash(k, h);
        self.db.set_node(Key(h), Node(a));
        h
    }

    fn node(&self, key: &Key) -> Node {
        *self
            .db
            .get_node(key)
            .unwrap_or_else(|| panic!("tree database is missing node {key:?}"))
    }

    /// Returns the value associated with the key if it is in the SMT, otherwise
    /// returns 0.
    pub fn get(&self, key: Key) -> U256 {
        let path = key.split();
        let mut level = 0;
        let mut acc_key = Bits::empty();
        let mut r = Key(self.root.elements);

        while !r.is_zero() {
            let node = self.node(&r);
            if node.is_leaf() {
                let found_key = Key::join(acc_key, node.rem_key());
                let value = if found_key == key {
                    let limbs = self.node(&Key(node.value_hash())).0[0..8]
                        .try_into()
                        .unwrap();
                    limbs2f(limbs)
                } else {
                    U256::zero()
                };
                debug_assert_eq!(value, self.kv_store.get(&key).copied().unwrap_or_default());
                return value;
            }
            let b = path.get_bit(level);
            r = Key(node.child(b));
            acc_key.push_bit(b);
            level += 1;
        }
        U256::zero()
    }

    /// Set the value associated with the key in the SMT.
    /// If the value is 0 and the key is in the SMT, the key is removed from the
    /// SMT and a leaf left alone under a single-child branch is pulled up.
    pub fn set(&mut self, key: Key, value: U256) {
        if value.is_zero() {
            self.kv_store.remove(&key);
        } else {
            self.kv_store.insert(key, value);
        }
        let path = key.split();
        let mut r = Key(self.root.elements);
        let mut new_root = self.root.elements;
        let mut level = 0isize;
        let mut acc_key = Bits::empty();
        // (full key, remaining key, value hash) of the leaf met on the path.
        let mut found = None;
        let mut siblings = vec![];

        while !r.is_zero() {
            let node = self.node(&r);
            siblings.push(node);
            if node.is_leaf() {
                let rem_key = node.rem_key();
                found = Some((Key::join(acc_key, rem_key), rem_key, node.value_hash()));
                break;
            }
            let b = path.get_bit(level as usize);
            r = Key(node.child(b));
            acc_key.push_bit(b);
            level += 1;
        }

        level -= 1;
        if !acc_key.is_empty() {
            acc_key.pop_next_bit();
        }
        trace!("Set traversed {} levels (leaf found: {})", level + 1, found.is_some());

        match found {
            Some((found_key, _, _)) if value.is_zero() && found_key == key => {
                if level >= 0 {
                    let lvl = level as usize;
                    siblings[lvl].set_child(path.get_bit(lvl), [F::ZERO; 4]);
                    let u = unique_child(&siblings[lvl])
                        .unwrap_or_else(|| panic!("branch at level {lvl} has no child left"));
                    let remaining = self.node(&Key(siblings[lvl].child(u)));
                    siblings[lvl + 1] = remaining;
                    if remaining.is_leaf() {
                        // Pull the remaining leaf up to the deepest branch that
                        // still has two children.
                        let val_h = remaining.value_hash();
                        let ins_key = Key::join(acc_key.add_bit(u), remaining.rem_key());
                        let mut single = true;
                        while single && level >= 0 {
                            level -= 1;
                            if level >= 0 {
                                single = unique_child(&siblings[level as usize]).is_some();
                            }
                        }

                        let old_key = ins_key.remove_key_bits((level + 1) as usize);
                        let old_leaf_hash = self.hash_key_hash(old_key, val_h);
                        if level >= 0 {
                            let lvl = level as usize;
                            siblings[lvl].set_child(path.get_bit(lvl), old_leaf_hash);
                        } else {
                            new_root = old_leaf_hash;
                        }
                    }
                } else {
                    new_root = [F::ZERO; 4];
                }
            }
            Some((found_key, found_rem_key, _)) if !value.is_zero() && found_key == key => {
                let new_val_h = self.hash0(f2limbs(value));
                let new_leaf_hash = self.hash_key_hash(found_rem_key, new_val_h);
                if level >= 0 {
                    let lvl = level as usize;
                    siblings[lvl].set_child(path.get_bit(lvl), new_leaf_hash);
                } else {
                    new_root = new_leaf_hash;
                }
            }
            Some((found_key, _, found_val_h)) if !value.is_zero() => {
                // Two different keys share the path so far: push both leaves
                // down to the first level where their paths diverge.
                let found_path = found_key.split();
                let mut level2 = level + 1;
                while path.get_bit(level2 as usize) == found_path.get_bit(level2 as usize) {
                    level2 += 1;
                }
                let old_key = found_key.remove_key_bits(level2 as usize + 1);
                let old_leaf_hash = self.hash_key_hash(old_key, found_val_h);

                let new_key = key.remove_key_bits(level2 as usize + 1);
                let new_val_h = self.hash0(f2limbs(value));
                let new_leaf_hash = self.hash_key_hash(new_key, new_val_h);

                let mut node = [F::ZERO; 8];
                place(&mut node, path.get_bit(level2 as usize), new_leaf_hash);
                place(&mut node, found_path.get_bit(level2 as usize), old_leaf_hash);

                let mut r2 = self.hash0(node);
                level2 -= 1;

                while level2 != level {
                    node = [F::ZERO; 8];
                    place(&mut node, path.get_bit(level2 as usize), r2);
                    r2 = self.hash0(node);
                    level2 -= 1;
                }

                if level >= 0 {
                    let lvl = level as usize;
                    siblings[lvl].set_child(path.get_bit(lvl), r2);
                } else {
                    new_root = r2;
                }
            }
            None if !value.is_zero() => {
                let new_key = key.remove_key_bits((level + 1) as usize);
                let new_val_h = self.hash0(f2limbs(value));
                let new_leaf_hash = self.hash_key_hash(new_key, new_val_h);

                if level >= 0 {
                    let lvl = level as usize;
                    siblings[lvl].set_child(path.get_bit(lvl), new_leaf_hash);
                } else {
                    new_root = new_leaf_hash;
                }
            }
            // Writing zero to an absent key.
            _ => {}
        }
        siblings.truncate((level + 1) as usize);

        while level >= 0 {
            let lvl = level as usize;
            new_root = siblings[lvl].hash();
            self.db.set_node(Key(new_root), siblings[lvl]);
            level -= 1;
            if level >= 0 {
                let up = level as usize;
                siblings[up].set_child(path.get_bit(up), new_root);
            }
        }
        self.root = HashOut { elements: new_root };
    }

    /// Delete the key in the SMT.
    pub fn delete(&mut self, key: Key) {
        self.set(key, U256::zero());
    }

    /// Collects the sibling hashes along the path of `key`, down to the leaf
    /// (or empty slot) the path ends on.
    pub fn proof(&self, key: Key) -> SmtProof {
        let path = key.split();
        let mut siblings = vec![];
        let mut r = Key(self.root.elements);

        while !r.is_zero() {
            let node = self.node(&r);
            if node.is_leaf() {
                return SmtProof {
                    siblings,
                    leaf: Some((node.rem_key(), node.value_hash())),
                };
            }
            let b = path.get_bit(siblings.len());
            siblings.push(node.child(!b));
            r = Key(node.child(b));
        }
        SmtProof {
            siblings,
            leaf: None,
        }
    }
}

/// Inclusion proof for one key of an [`Smt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtProof {
    /// Hashes of the siblings met from the root down.
    pub siblings: Vec<[F; 4]>,
    /// Remaining key and value hash of the leaf the path ends on, if any.
    pub leaf: Option<(Key, [F; 4])>,
}

impl SmtProof {
    /// Checks that `key` maps to `value` in the tree with root `root`.
    pub fn verify(&self, root: HashOut, key: Key, value: U256) -> bool {
        let Some((rem_key, value_h)) = self.leaf else {
            return false;
        };
        if rem_key != key.remove_key_bits(self.siblings.len()) || value_h != hash0(f2limbs(value))
        {
            return false;
        }

        let path = key.split();
        let mut acc = hash_key_hash(rem_key, value_h);
        for (level, sibling) in self.siblings.iter().enumerate().rev() {
            let b = path.get_bit(level);
            let mut node = [F::ZERO; 8];
            place(&mut node, b, acc);
            place(&mut node, !b, *sibling);
            acc = hash0(node);
        }
        acc == root.elements
    }
}
