//! Sparse Merkle trees over the Goldilocks field, keyed by rollup account
//! index.
//!
//! The same tree type backs both the account state tree and the per-batch
//! exit tree. Leaves are placed at the shortest key prefix that is unique in
//! the tree, and the path of a key is the account index read least
//! significant bit first (see [`keys::key_index`]).

#![allow(clippy::too_long_first_doc_paragraph)]

pub mod bits;
pub mod db;
pub mod keys;
pub mod smt;
#[cfg(test)]
mod smt_test;
pub mod utils;
