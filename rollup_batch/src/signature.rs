//! The seam to the signature scheme that authorises L2 transactions.
//!
//! Key decompression and signature checking live outside this crate; the
//! batch builder only needs the two operations of [`SignatureScheme`].

use ethereum_types::U256;
use plonky2::field::types::Field;
use plonky2::hash::poseidon::PoseidonHash;
use plonky2::plonk::config::Hasher;
use serde::{Deserialize, Serialize};
use smt_trie::smt::F;
use smt_trie::utils::hashout2u;

use crate::account::{BjjCompressed, PublicKey};
use crate::error::TxRejection;
use crate::float16::Float16;
use crate::tx::L2Tx;

/// An EdDSA signature over BabyJubJub.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub r8x: U256,
    pub r8y: U256,
    pub s: U256,
}

pub trait SignatureScheme {
    /// Expands a compressed key, or returns `None` if it is not a curve
    /// point.
    fn decompress(&self, bjj: &BjjCompressed) -> Option<PublicKey>;

    fn verify(&self, public_key: &PublicKey, msg: U256, signature: &Signature) -> bool;
}

impl<S: SignatureScheme + ?Sized> SignatureScheme for &S {
    fn decompress(&self, bjj: &BjjCompressed) -> Option<PublicKey> {
        (**self).decompress(bjj)
    }

    fn verify(&self, public_key: &PublicKey, msg: U256, signature: &Signature) -> bool {
        (**self).verify(public_key, msg, signature)
    }
}

/// Expands `bjj`, falling back to [`PublicKey::IDENTITY`] for keys that do
/// not decompress.
pub fn expand_or_identity<S: SignatureScheme + ?Sized>(scheme: &S, bjj: &BjjCompressed) -> PublicKey {
    scheme.decompress(bjj).unwrap_or(PublicKey::IDENTITY)
}

/// The amount of an L2 transaction in its encoded form. Only exactly
/// representable amounts can be signed and posted.
pub fn l2_amount_f(tx: &L2Tx) -> Result<Float16, TxRejection> {
    Float16::exact_from(tx.amount).ok_or(TxRejection::AmountNotFloat16(tx.amount))
}

/// The message the sender of an L2 transaction signs: the Poseidon hash of
/// `fromIdx`, `toIdx`, `tokenID`, `amountF`, the fee selector, the nonce and
/// the chain id.
pub fn l2_message(tx: &L2Tx, chain_id: u16) -> Result<U256, TxRejection> {
    let amount_f = l2_amount_f(tx)?;
    let payload = [
        F::from_noncanonical_u64(tx.from_idx),
        F::from_noncanonical_u64(tx.to_idx),
        F::from_canonical_u32(tx.token_id),
        F::from_canonical_u16(amount_f.0),
        F::from_canonical_u8(tx.fee),
        F::from_noncanonical_u64(tx.nonce),
        F::from_canonical_u16(chain_id),
    ];
    Ok(hashout2u(PoseidonHash::hash_no_pad(&payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> L2Tx {
        L2Tx {
            from_idx: 256,
            to_idx: 257,
            token_id: 1,
            amount: U256::from(50),
            fee: 126,
            nonce: 0,
            ..Default::default()
        }
    }

    #[test]
    fn message_binds_chain_and_nonce() {
        let m = l2_message(&tx(), 0).unwrap();
        assert_ne!(m, l2_message(&tx(), 1).unwrap());

        let mut bumped = tx();
        bumped.nonce = 1;
        assert_ne!(m, l2_message(&bumped, 0).unwrap());
    }

    #[test]
    fn message_ignores_the_signature() {
        let mut signed = tx();
        signed.signature.s = U256::from(7);
        assert_eq!(l2_message(&signed, 0), l2_message(&tx(), 0));
    }

    #[test]
    fn inexact_amounts_cannot_be_signed() {
        let mut bad = tx();
        bad.amount = U256::from(10_241);
        assert_eq!(
            l2_message(&bad, 0),
            Err(TxRejection::AmountNotFloat16(U256::from(10_241)))
        );
    }
}
