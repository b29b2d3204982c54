use ethereum_types::U256;
use plonky2::field::types::{Field, PrimeField64};
use plonky2::hash::poseidon::Poseidon;

use crate::smt::{HashOut, Key, Node, F};

/// Returns `Poseidon(x, [0,0,0,0])`.
pub(crate) fn hash0(x: [F; 8]) -> [F; 4] {
    F::poseidon(std::array::from_fn(|i| if i < 8 { x[i] } else { F::ZERO }))[0..4]
        .try_into()
        .unwrap()
}

/// Returns `Poseidon(x, [1,0,0,0])`.
pub(crate) fn hash1(x: [F; 8]) -> [F; 4] {
    F::poseidon(std::array::from_fn(|i| match i {
        j if j < 8 => x[i],
        8 => F::ONE,
        _ => F::ZERO,
    }))[0..4]
        .try_into()
        .unwrap()
}

/// Returns `Poseidon(key || h, [1,0,0,0])`, the hash of a leaf.
pub(crate) fn hash_key_hash(k: Key, h: [F; 4]) -> [F; 4] {
    hash1(std::array::from_fn(
        |i| if i < 4 { k.0[i] } else { h[i - 4] },
    ))
}

/// Split a U256 into 8 32-bit limbs in little-endian order.
pub fn f2limbs(x: U256) -> [F; 8] {
    std::array::from_fn(|i| F::from_canonical_u32((x >> (32 * i)).low_u32()))
}

/// Pack 8 32-bit limbs in little-endian order into a U256.
pub fn limbs2f(limbs: [F; 8]) -> U256 {
    limbs
        .into_iter()
        .enumerate()
        .fold(U256::zero(), |acc, (i, x)| {
            acc + (U256::from(x.to_canonical_u64()) << (i * 32))
        })
}

/// Convert a `HashOut` to a `U256`, first element in the lowest limb.
pub fn hashout2u(h: HashOut) -> U256 {
    key2u(Key(h.elements))
}

/// Inverse of [`hashout2u`].
pub fn u2hashout(x: U256) -> HashOut {
    HashOut {
        elements: x.0.map(F::from_noncanonical_u64),
    }
}

/// Convert a `Key` to a `U256`.
pub fn key2u(key: Key) -> U256 {
    U256(key.0.map(|x| x.to_canonical_u64()))
}

/// Given an internal node, return the direction of its only non-empty child,
/// or `None` if it has zero or two children.
pub(crate) fn unique_child(node: &Node) -> Option<bool> {
    match (node.child(false).iter().all(F::is_zero), node.child(true).iter().all(F::is_zero)) {
        (false, true) => Some(false),
        (true, false) => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limbs_round_trip() {
        let x = U256([u64::MAX, 0x0123_4567_89ab_cdef, 7, 1 << 63]);
        assert_eq!(limbs2f(f2limbs(x)), x);
    }

    #[test]
    fn hashout_round_trip() {
        let h = HashOut {
            elements: [1, 2, 3, 4].map(F::from_canonical_u64),
        };
        assert_eq!(u2hashout(hashout2u(h)), h);
    }
}
