//! Rollup accounts and the leaf hash they commit to in the state tree.

use ethereum_types::{Address, U256};
use plonky2::field::types::Field;
use plonky2::hash::poseidon::PoseidonHash;
use plonky2::plonk::config::Hasher;
use serde::{Deserialize, Serialize};
use smt_trie::smt::F;
use smt_trie::utils::{f2limbs, hashout2u};

/// Position of an account in the state tree.
pub type Idx = u64;
pub type TokenId = u32;

/// A compressed BabyJubJub public key: the sign of `ax` in bit 255 and `ay`
/// in the low 255 bits.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BjjCompressed(pub U256);

impl BjjCompressed {
    pub fn sign(&self) -> bool {
        self.0.bit(255)
    }

    pub fn ay(&self) -> U256 {
        self.0 & ((U256::one() << 255) - 1)
    }
}

/// An expanded BabyJubJub point.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    pub ax: U256,
    pub ay: U256,
}

impl PublicKey {
    /// The neutral element of the curve. Keys that fail to decompress are
    /// expanded to this point.
    pub const IDENTITY: Self = Self {
        ax: U256([0; 4]),
        ay: U256([1, 0, 0, 0]),
    };
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub idx: Idx,
    pub token_id: TokenId,
    pub nonce: u64,
    pub balance: U256,
    pub bjj: BjjCompressed,
    pub public_key: PublicKey,
    pub eth_addr: Address,
}

impl Account {
    /// A fresh account with zero balance and nonce.
    pub fn new(
        idx: Idx,
        token_id: TokenId,
        bjj: BjjCompressed,
        public_key: PublicKey,
        eth_addr: Address,
    ) -> Self {
        Self {
            idx,
            token_id,
            nonce: 0,
            balance: U256::zero(),
            bjj,
            public_key,
            eth_addr,
        }
    }

    /// Hash of the leaf stored for this account.
    ///
    /// The payload is `tokenID`, `nonce`, `sign`, the balance and `ay` as
    /// 32-bit limbs, and the Ethereum address as five big-endian 32-bit
    /// words.
    pub fn state_hash(&self) -> U256 {
        let mut payload = vec![
            F::from_canonical_u32(self.token_id),
            F::from_canonical_u64(self.nonce),
            F::from_bool(self.bjj.sign()),
        ];
        payload.extend(f2limbs(self.balance));
        payload.extend(f2limbs(self.bjj.ay()));
        payload.extend(
            self.eth_addr
                .as_bytes()
                .chunks_exact(4)
                .map(|w| F::from_canonical_u32(u32::from_be_bytes([w[0], w[1], w[2], w[3]]))),
        );
        hashout2u(PoseidonHash::hash_no_pad(&payload))
    }
}
