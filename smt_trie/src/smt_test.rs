use ethereum_types::U256;
use plonky2::field::types::Field;
use rand::{random, thread_rng, Rng};

use crate::keys::key_index;
use crate::{
    db::MemoryDb,
    smt::{Smt, F},
};

fn common_setup() {
    let _ = pretty_env_logger::try_init();
}

fn random_value() -> U256 {
    // Never zero, so every write is an insert.
    U256(thread_rng().gen()) | U256::one()
}

#[test]
fn test_get_on_empty_tree() {
    let smt = Smt::<MemoryDb>::default();
    assert_eq!(smt.get(key_index(256)), U256::zero());
    assert_eq!(smt.root.elements, [F::ZERO; 4]);
}

#[test]
fn test_add_and_rem() {
    common_setup();
    let mut smt = Smt::<MemoryDb>::default();

    let k = key_index(random::<u32>() as u64);
    let v = random_value();
    smt.set(k, v);
    assert_eq!(v, smt.get(k));

    smt.set(k, U256::zero());
    assert_eq!(smt.root.elements, [F::ZERO; 4]);
}

#[test]
fn test_single_leaf_known_root() {
    let mut smt = Smt::<MemoryDb>::default();

    let k = key_index(1);
    let v = U256::from(2);
    smt.set(k, v);
    assert_eq!(v, smt.get(k));
    assert_eq!(
        smt.root.elements,
        [
            16483217357039062949,
            6830539605347455377,
            6826288191577443203,
            8219762152026661456
        ]
        .map(F::from_canonical_u64)
    );

    smt.set(k, U256::zero());
    assert_eq!(smt.root.elements, [F::ZERO; 4]);
}

#[test]
fn test_update_element() {
    let mut smt = Smt::<MemoryDb>::default();

    let k = key_index(300);
    let v1 = random_value();
    let v2 = random_value();
    smt.set(k, v1);
    let root = smt.root;
    smt.set(k, v2);
    assert_eq!(smt.get(k), v2);
    smt.set(k, v1);
    assert_eq!(smt.root, root);
}

#[test]
fn test_add_shared_element_3() {
    let mut smt = Smt::<MemoryDb>::default();

    // 256, 257 and 258 only differ in their two lowest bits.
    let keys = [256, 257, 258].map(key_index);
    for k in keys {
        smt.set(k, random_value());
    }
    for k in keys {
        smt.set(k, U256::zero());
    }
    assert_eq!(smt.root.elements, [F::ZERO; 4]);
}

#[test]
fn test_add_remove_128() {
    common_setup();
    let mut smt = Smt::<MemoryDb>::default();

    let kvs = (0..128u64)
        .map(|i| {
            let k = key_index(256 + i * 7);
            let v = random_value();
            smt.set(k, v);
            (k, v)
        })
        .collect::<Vec<_>>();
    for &(k, v) in &kvs {
        assert_eq!(smt.get(k), v);
    }
    for &(k, _) in &kvs {
        smt.set(k, U256::zero());
    }
    assert_eq!(smt.root.elements, [F::ZERO; 4]);
}

#[test]
fn test_root_independent_of_insertion_order() {
    let kvs = (0..64u64)
        .map(|i| (key_index(256 + i), random_value()))
        .collect::<Vec<_>>();

    let mut forward = Smt::<MemoryDb>::default();
    for &(k, v) in &kvs {
        forward.set(k, v);
    }
    let mut backward = Smt::<MemoryDb>::default();
    for &(k, v) in kvs.iter().rev() {
        backward.set(k, v);
    }
    assert_eq!(forward.root, backward.root);
}

#[test]
fn test_add_element_similar_key() {
    let mut smt = Smt::<MemoryDb>::default();

    // These indices map to the keys [0, 0, 0, 0], [15, 0, 0, 0] and
    // [31, 0, 0, 0].
    let k1 = key_index(0);
    let k2 = key_index(4369);
    let k3 = key_index(69905);
    let v1 = U256::from(2);
    let v2 = U256::from(3);
    smt.set(k1, v1);
    smt.set(k2, v1);
    smt.set(k3, v2);

    let expected_root = [
        442750481621001142,
        12174547650106208885,
        10730437371575329832,
        4693848817100050981,
    ]
    .map(F::from_canonical_u64);
    assert_eq!(smt.root.elements, expected_root);
}

#[test]
fn test_no_write_0() {
    let mut smt = Smt::<MemoryDb>::default();

    let k1 = key_index(1000);
    let k2 = key_index(1001);
    let v = random_value();
    smt.set(k1, v);
    let root = smt.root;
    smt.set(k2, U256::zero());
    assert_eq!(smt.root, root);
}

#[test]
fn test_proof_verifies_every_leaf() {
    let mut smt = Smt::<MemoryDb>::default();

    let kvs = (0..40u64)
        .map(|i| (key_index(256 + i * 3), random_value()))
        .collect::<Vec<_>>();
    for &(k, v) in &kvs {
        smt.set(k, v);
    }
    for &(k, v) in &kvs {
        let proof = smt.proof(k);
        assert!(proof.verify(smt.root, k, v));
        assert!(!proof.verify(smt.root, k, v + 1));
    }
}

#[test]
fn test_proof_of_absent_key_does_not_verify() {
    let mut smt = Smt::<MemoryDb>::default();
    smt.set(key_index(256), U256::from(5));
    smt.set(key_index(257), U256::from(6));

    let absent = key_index(260);
    let proof = smt.proof(absent);
    assert!(!proof.verify(smt.root, absent, U256::from(5)));
    assert!(!proof.verify(smt.root, absent, U256::zero()));
}

#[test]
fn test_single_leaf_proof_is_empty_path() {
    let mut smt = Smt::<MemoryDb>::default();
    let k = key_index(256);
    smt.set(k, U256::from(42));

    let proof = smt.proof(k);
    assert!(proof.siblings.is_empty());
    assert!(proof.verify(smt.root, k, U256::from(42)));
}
