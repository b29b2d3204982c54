use ethereum_types::U256;
use serde::{Deserialize, Serialize};

pub type Bit = bool;

/// A path into the tree: a sequence of at most 256 branch directions, the
/// first direction taken from the root being the most significant one.
#[derive(
    Copy, Clone, Deserialize, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Debug,
)]
pub struct Bits {
    /// The number of bits in this sequence.
    pub count: usize,
    /// A packed encoding of these bits. Only the first (least significant)
    /// `count` bits are used. The rest are unused and should be zero.
    pub packed: U256,
}

impl Bits {
    pub const fn empty() -> Self {
        Bits {
            count: 0,
            packed: U256::zero(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Removes and returns the most recently pushed direction.
    pub fn pop_next_bit(&mut self) -> Bit {
        assert!(!self.is_empty(), "Cannot pop from empty bits");
        let b = self.packed.bit(0);
        self.packed >>= 1;
        self.count -= 1;
        b
    }

    /// Direction taken at depth `i`, counted from the root.
    pub fn get_bit(&self, i: usize) -> Bit {
        assert!(i < self.count, "Index out of bounds");
        self.packed.bit(self.count - 1 - i)
    }

    pub fn push_bit(&mut self, bit: Bit) {
        assert!(self.count < 256, "Overflow");
        self.packed = (self.packed << 1) | U256::from(bit as u64);
        self.count += 1;
    }

    pub fn add_bit(&self, bit: Bit) -> Self {
        let mut x = *self;
        x.push_bit(bit);
        x
    }
}
