//! Pull-based range iteration (spec 4.1 `range_query`, design note in
//! section 9: "expose it as a pull-based cursor with `next() -> Option<(k,
//! v)>`" since the source's iteration protocol has no direct counterpart
//! here).

use log::trace;

use crate::btree::entry::{CompressibleKey, CompressibleValue};
use crate::btree::node::NodeId;
use crate::btree::tree::PostgreSQLBTree;

/// A finite, single-pass, non-restartable cursor over `[start, end]` (or
/// the open variant when `inclusive` is false). Walks leaves via
/// `next_leaf`, materializing each as it's reached.
pub struct RangeCursor<'a, K, V> {
    tree: &'a mut PostgreSQLBTree<K, V>,
    current_leaf: Option<NodeId>,
    index: usize,
    start: K,
    end: K,
    inclusive: bool,
    done: bool,
}

impl<'a, K: CompressibleKey, V: CompressibleValue> RangeCursor<'a, K, V> {
    pub(crate) fn new(tree: &'a mut PostgreSQLBTree<K, V>, leaf: Option<NodeId>, start: K, end: K, inclusive: bool) -> Self {
        let done = leaf.is_none();
        Self {
            tree,
            current_leaf: leaf,
            index: 0,
            start,
            end,
            inclusive,
            done,
        }
    }

    fn below_start(&self, key: &K) -> bool {
        *key < self.start || (!self.inclusive && *key == self.start)
    }

    fn above_end(&self, key: &K) -> bool {
        *key > self.end || (!self.inclusive && *key == self.end)
    }

    /// Advances the cursor, returning the next `(key, value)` in range, or
    /// `None` once the upper bound is passed or every leaf is exhausted.
    /// Fatal decompression errors (spec section 7: a metadata/blob
    /// mismatch indicates memory corruption in this in-memory design) end
    /// the cursor by panicking rather than returning a confusing `None`.
    pub fn next(&mut self) -> Option<(K, V)> {
        loop {
            if self.done {
                return None;
            }
            let leaf_id = self.current_leaf?;
            self.tree
                .materialize_node(leaf_id)
                .expect("range cursor hit a corrupted page");

            let (len, next_leaf) = {
                let node = self.tree.node(leaf_id);
                (node.entries.len(), node.next_leaf)
            };

            if self.index >= len {
                trace!("cursor exhausted leaf {:?}, advancing to {:?}", leaf_id, next_leaf);
                self.current_leaf = next_leaf;
                self.index = 0;
                if self.current_leaf.is_none() {
                    self.done = true;
                }
                continue;
            }

            let entry = &self.tree.node(leaf_id).entries[self.index];
            trace!("cursor at leaf {:?} index {}", leaf_id, self.index);
            if self.above_end(&entry.key) {
                self.done = true;
                return None;
            }
            if self.below_start(&entry.key) {
                self.index += 1;
                continue;
            }

            let result = (entry.key.clone(), entry.value.clone());
            self.index += 1;
            return Some(result);
        }
    }
}

impl<'a, K: CompressibleKey, V: CompressibleValue> Iterator for RangeCursor<'a, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        RangeCursor::next(self)
    }
}
