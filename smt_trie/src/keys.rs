//! Tree keys for rollup indices.
//!
//! [`Key::split`](crate::smt::Key::split) walks the four key limbs round-robin,
//! one bit of each limb per round. Spreading the index bits the same way
//! makes the tree path equal to the index read least significant bit first,
//! which is the path an index-keyed circuit tree walks.
use plonky2::field::types::Field;

use crate::smt::{Key, F};

/// Key of the leaf holding the account (or exit) at `idx`.
pub fn key_index(idx: u64) -> Key {
    let mut limbs = [0u64; 4];
    for bit in 0..64 {
        if (idx >> bit) & 1 == 1 {
            limbs[bit % 4] |= 1 << (bit / 4);
        }
    }
    Key(limbs.map(F::from_canonical_u64))
}
