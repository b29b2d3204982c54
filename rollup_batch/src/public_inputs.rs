//! The public input of a batch proof.
//!
//! Every field is written most significant bit first and fields follow each
//! other without padding:
//!
//! ```text
//! oldLastIdx | newLastIdx | oldStateRoot | newStateRoot | newExitRoot |
//! L1TxsData | L1L2TxsData | feeTxsData | chainID
//! ```
//!
//! The bit string is packed into bytes, hashed with SHA-256, and the digest
//! (read big-endian) is reduced into the BN254 scalar field.

use bitvec::order::Msb0;
use bitvec::vec::BitVec;
use ethereum_types::{Address, U256};
use log::trace;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::account::Idx;
use crate::config::BatchConfig;
use crate::constants::{
    BJJ_COMPRESSED_BITS, CHAIN_ID_BITS, ETH_ADDR_BITS, FEE_SELECTOR_BITS, FLOAT16_BITS,
    MAX_IDX_BITS, ROOT_BITS, TOKEN_ID_BITS,
};
use crate::engine::TxWitness;
use crate::error::{BatchError, BatchResult};
use crate::tx::L1Tx;

pub type Bits = BitVec<u8, Msb0>;

/// Order of the BN254 scalar field.
pub const SNARK_SCALAR_FIELD: U256 = U256([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// Appends the low `width` bits of `value`, most significant first.
pub fn push_field(bits: &mut Bits, field: &'static str, value: U256, width: usize) -> BatchResult<()> {
    if value.bits() > width {
        return Err(BatchError::FieldOverflow {
            field,
            value,
            width,
        });
    }
    trace!("public inputs: {field} = {value:#x} ({width} bits)");
    bits.extend((0..width).rev().map(|i| i < 256 && value.bit(i)));
    Ok(())
}

fn address_value(addr: Address) -> U256 {
    U256::from_big_endian(addr.as_bytes())
}

/// Appends one L1 slot: fromEthAddr, fromBjj, fromIdx, loadAmountF, amountF,
/// tokenID, toIdx.
pub fn push_l1_tx(bits: &mut Bits, tx: &L1Tx) -> BatchResult<()> {
    push_field(bits, "fromEthAddr", address_value(tx.from_eth_addr), ETH_ADDR_BITS)?;
    push_field(bits, "fromBjj", tx.from_bjj.0, BJJ_COMPRESSED_BITS)?;
    push_field(bits, "fromIdx", tx.from_idx.into(), MAX_IDX_BITS)?;
    push_field(bits, "loadAmountF", tx.load_amount_f.0.into(), FLOAT16_BITS)?;
    push_field(bits, "amountF", tx.amount_f.0.into(), FLOAT16_BITS)?;
    push_field(bits, "tokenID", tx.token_id.into(), TOKEN_ID_BITS)?;
    push_field(bits, "toIdx", tx.to_idx.into(), MAX_IDX_BITS)
}

/// Appends one L2 slot with the effective values of `witness`.
pub fn push_l2_slot(bits: &mut Bits, witness: &TxWitness, idx_bits: usize) -> BatchResult<()> {
    let data = witness.slot_data()?;
    push_field(bits, "fromIdx", data.from_idx.into(), idx_bits)?;
    push_field(bits, "toIdx", data.to_idx.into(), idx_bits)?;
    push_field(bits, "amountF", data.amount_f.0.into(), FLOAT16_BITS)?;
    push_field(bits, "fee", data.fee.into(), FEE_SELECTOR_BITS)
}

fn as_hex<T: AsRef<[u8]>, S: Serializer>(bytes: &T, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}

/// Everything the batch proof commits to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInputs {
    pub old_last_idx: Idx,
    pub new_last_idx: Idx,
    pub old_state_root: U256,
    pub new_state_root: U256,
    pub new_exit_root: U256,
    /// Raw L1 slots, `maxL1Tx * 72` bytes.
    #[serde(serialize_with = "as_hex")]
    pub l1_txs_data: Vec<u8>,
    /// Every slot in L2 format, `nTx` slots.
    #[serde(serialize_with = "as_hex")]
    pub l2_txs_data: Vec<u8>,
    #[serde(serialize_with = "as_hex")]
    pub fee_txs_data: Vec<u8>,
    pub chain_id: u16,
}

impl PublicInputs {
    /// Encodes a batch. `l1_txs` are the raw L1 transactions in slot order,
    /// `witnesses` one entry per slot.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &BatchConfig,
        old_last_idx: Idx,
        new_last_idx: Idx,
        old_state_root: U256,
        new_state_root: U256,
        new_exit_root: U256,
        l1_txs: &[L1Tx],
        witnesses: &[TxWitness],
        fee_idxs: &[Idx],
    ) -> BatchResult<Self> {
        if l1_txs.len() > config.max_l1_tx {
            return Err(BatchError::TooManyL1Txs {
                max: config.max_l1_tx,
            });
        }
        if witnesses.len() > config.n_tx {
            return Err(BatchError::TooManyTxs { max: config.n_tx });
        }
        if fee_idxs.len() > config.max_fee_tx {
            return Err(BatchError::TooManyFeeIdxs {
                max: config.max_fee_tx,
                got: fee_idxs.len(),
            });
        }

        let mut l1 = Bits::with_capacity(config.l1_txs_bits());
        for tx in l1_txs {
            push_l1_tx(&mut l1, tx)?;
        }
        l1.resize(config.l1_txs_bits(), false);

        let idx_bits = config.idx_bits();
        let mut l2 = Bits::with_capacity(config.l2_txs_bits());
        for witness in witnesses {
            push_l2_slot(&mut l2, witness, idx_bits)?;
        }
        l2.resize(config.l2_txs_bits(), false);

        let mut fee = Bits::with_capacity(config.fee_txs_bits());
        for &idx in fee_idxs {
            push_field(&mut fee, "feeIdx", idx.into(), idx_bits)?;
        }
        fee.resize(config.fee_txs_bits(), false);

        Ok(Self {
            old_last_idx,
            new_last_idx,
            old_state_root,
            new_state_root,
            new_exit_root,
            l1_txs_data: l1.into_vec(),
            l2_txs_data: l2.into_vec(),
            fee_txs_data: fee.into_vec(),
            chain_id: config.chain_id,
        })
    }

    /// The whole public input as one bit string.
    pub fn to_bits(&self) -> BatchResult<Bits> {
        let mut bits = Bits::new();
        push_field(&mut bits, "oldLastIdx", self.old_last_idx.into(), MAX_IDX_BITS)?;
        push_field(&mut bits, "newLastIdx", self.new_last_idx.into(), MAX_IDX_BITS)?;
        push_field(&mut bits, "oldStateRoot", self.old_state_root, ROOT_BITS)?;
        push_field(&mut bits, "newStateRoot", self.new_state_root, ROOT_BITS)?;
        push_field(&mut bits, "newExitRoot", self.new_exit_root, ROOT_BITS)?;
        bits.extend_from_raw_slice(&self.l1_txs_data);
        bits.extend_from_raw_slice(&self.l2_txs_data);
        bits.extend_from_raw_slice(&self.fee_txs_data);
        push_field(&mut bits, "chainID", self.chain_id.into(), CHAIN_ID_BITS)?;
        Ok(bits)
    }

    /// The bit string packed into bytes. Every section is a whole number of
    /// bytes, so no bits are left over.
    pub fn to_bytes(&self) -> BatchResult<Vec<u8>> {
        Ok(self.to_bits()?.into_vec())
    }

    /// The single field element the proof exposes.
    pub fn hash(&self) -> BatchResult<U256> {
        Ok(hash_bytes(&self.to_bytes()?))
    }

    pub fn l1_txs_data_hex(&self) -> String {
        hex::encode(&self.l1_txs_data)
    }

    pub fn l2_txs_data_hex(&self) -> String {
        hex::encode(&self.l2_txs_data)
    }

    pub fn fee_txs_data_hex(&self) -> String {
        hex::encode(&self.fee_txs_data)
    }
}

/// SHA-256 of `bytes`, read big-endian and reduced modulo the BN254 scalar
/// field order.
pub fn hash_bytes(bytes: &[u8]) -> U256 {
    let digest = Sha256::digest(bytes);
    U256::from_big_endian(&digest) % SNARK_SCALAR_FIELD
}
