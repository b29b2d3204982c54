//! Encoding widths and reserved indices shared with the proving backend.
//!
//! Every width here is part of the public-input contract: changing one
//! changes the layout the circuit hashes.

use static_assertions::const_assert_eq;

use crate::account::Idx;

/// Last reserved index. The account tree starts with this as its last index.
pub const INITIAL_LAST_IDX: Idx = 255;
/// First index handed out to a user account.
pub const FIRST_IDX: Idx = INITIAL_LAST_IDX + 1;
/// Destination index that sends funds to the exit tree.
pub const EXIT_IDX: Idx = 1;
/// Deepest account tree the encoding supports.
pub const MAX_NLEVELS: usize = 48;

pub const MAX_IDX_BITS: usize = 48;
pub const ETH_ADDR_BITS: usize = 160;
pub const BJJ_COMPRESSED_BITS: usize = 256;
pub const FLOAT16_BITS: usize = 16;
pub const TOKEN_ID_BITS: usize = 32;
pub const FEE_SELECTOR_BITS: usize = 8;
pub const CHAIN_ID_BITS: usize = 16;
pub const ROOT_BITS: usize = 256;
pub const NONCE_BITS: usize = 40;
pub const BALANCE_BITS: usize = 192;

/// Width of one L1 slot: fromEthAddr, fromBjjCompressed, fromIdx,
/// loadAmountF, amountF, tokenID, toIdx.
pub const L1_TX_BITS: usize = ETH_ADDR_BITS
    + BJJ_COMPRESSED_BITS
    + MAX_IDX_BITS
    + FLOAT16_BITS
    + FLOAT16_BITS
    + TOKEN_ID_BITS
    + MAX_IDX_BITS;

const_assert_eq!(L1_TX_BITS, 72 * 8);

/// Width of an index inside L2 and fee slots: `n_levels` rounded up to whole
/// bytes.
pub const fn idx_bits(n_levels: usize) -> usize {
    n_levels.div_ceil(8) * 8
}

/// Width of one L2 slot: fromIdx, toIdx, amountF, fee selector.
pub const fn l2_tx_bits(n_levels: usize) -> usize {
    2 * idx_bits(n_levels) + FLOAT16_BITS + FEE_SELECTOR_BITS
}

const_assert_eq!(l2_tx_bits(16), 56);
const_assert_eq!(idx_bits(MAX_NLEVELS), MAX_IDX_BITS);
