use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::smt::{Key, Node};

/// Node storage for an [`Smt`](crate::smt::Smt), addressed by node hash.
pub trait Db: Default {
    fn get_node(&self, key: &Key) -> Option<&Node>;
    fn set_node(&mut self, key: Key, value: Node);
}

/// In-memory node storage. Cloning it yields an independent snapshot of the
/// tree, which is how batches are built against a fixed prior root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDb {
    pub nodes: HashMap<Key, Node>,
}

impl MemoryDb {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Db for MemoryDb {
    fn get_node(&self, key: &Key) -> Option<&Node> {
        self.nodes.get(key)
    }

    fn set_node(&mut self, key: Key, value: Node) {
        self.nodes.insert(key, value);
    }
}
