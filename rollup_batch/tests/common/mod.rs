#![allow(dead_code)]

use ethereum_types::{Address, H160, U256};
use hex_literal::hex;
use rollup_batch::account::{BjjCompressed, Idx, PublicKey, TokenId};
use rollup_batch::constants::EXIT_IDX;
use rollup_batch::fee::FeeSelector;
use rollup_batch::float16::Float16;
use rollup_batch::signature::{l2_message, Signature, SignatureScheme};
use rollup_batch::tx::{L1Tx, L2Tx};
use rollup_batch::BatchConfig;

pub const ALICE: Address = H160(hex!("7e5f4552091a69125d5dfcb7b8c2659029395bdf"));
pub const BOB: Address = H160(hex!("2b5ad5c4795c026514f8317c7a215e218dccd6cf"));

/// A key that does not decompress to a curve point.
pub const INVALID_BJJ: BjjCompressed = BjjCompressed(U256::MAX);

pub fn common_setup() {
    let _ = pretty_env_logger::try_init();
}

/// Keys expand to `(0, bjj)`. A signature is valid when its `s` is the
/// signed message itself.
pub struct TestScheme;

impl SignatureScheme for TestScheme {
    fn decompress(&self, bjj: &BjjCompressed) -> Option<PublicKey> {
        (!bjj.0.is_zero() && *bjj != INVALID_BJJ).then_some(PublicKey {
            ax: U256::zero(),
            ay: bjj.0,
        })
    }

    fn verify(&self, _: &PublicKey, msg: U256, signature: &Signature) -> bool {
        signature.s == msg
    }
}

/// `nTx = 8`, 16 levels, 4 L1 slots, 2 fee slots, chain 1.
pub fn config() -> BatchConfig {
    BatchConfig::new(8, 16, 4, 2, 1).unwrap()
}

pub fn bjj(n: u64) -> BjjCompressed {
    BjjCompressed(U256::from(n))
}

pub fn fix(amount: u64) -> Float16 {
    Float16::exact_from(U256::from(amount)).unwrap()
}

pub fn create_account(owner: Address, token_id: TokenId, load: u64) -> L1Tx {
    L1Tx {
        load_amount_f: fix(load),
        token_id,
        from_bjj: bjj(7),
        from_eth_addr: owner,
        ..Default::default()
    }
}

pub fn deposit_transfer(
    owner: Address,
    from_idx: Idx,
    to_idx: Idx,
    token_id: TokenId,
    load: u64,
    amount: u64,
) -> L1Tx {
    L1Tx {
        from_idx,
        load_amount_f: fix(load),
        token_id,
        from_eth_addr: owner,
        to_idx,
        amount_f: fix(amount),
        ..Default::default()
    }
}

pub fn force_exit(owner: Address, from_idx: Idx, token_id: TokenId, amount: u64) -> L1Tx {
    deposit_transfer(owner, from_idx, EXIT_IDX, token_id, 0, amount)
}

/// An L2 transfer signed for `chain_id`.
pub fn signed_transfer(
    from_idx: Idx,
    to_idx: Idx,
    token_id: TokenId,
    amount: u64,
    fee: FeeSelector,
    nonce: u64,
    chain_id: u16,
) -> L2Tx {
    let mut tx = L2Tx {
        from_idx,
        to_idx,
        token_id,
        amount: amount.into(),
        fee,
        nonce,
        ..Default::default()
    };
    tx.signature.s = l2_message(&tx, chain_id).unwrap();
    tx
}
