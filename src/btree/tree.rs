//! `PostgreSQLBTree` — the top-level index (spec 4.1, 4.2): root pointer,
//! order, global statistics, and the public insert/search/delete/
//! range_query/compress_all_pages/get_statistics surface. Pages live in
//! an arena (`Vec<Option<BTreeNode<K, V>>>`); `parent` and `next_leaf` are
//! arena-index back-references, never owning (design note, section 9).

use std::collections::HashMap;

use log::{debug, trace};

use crate::btree::cursor::RangeCursor;
use crate::btree::entry::{CompressibleKey, CompressibleValue, KeyValue};
use crate::btree::node::{BTreeNode, NodeId};
use crate::compression::{CompressionManager, CompressionStats, Strategy};
use crate::config::BTreeConfig;
use crate::error::{BTreeError, BTreeResult};

/// Snapshot returned by [`PostgreSQLBTree::get_statistics`] (spec 4.1,
/// section 6).
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub height: usize,
    pub node_count: usize,
    pub total_keys: usize,
    pub avg_fill_ratio: f64,
    pub compression_ratio: Option<f64>,
}

/// Counters returned by [`PostgreSQLBTree::compress_all_pages`] (section
/// 6). `failures` counts attempts that landed on [`Strategy::None`] —
/// every strategy the manager tried was rejected as insufficient gain,
/// not that an encoder raised an error (those are absorbed even earlier,
/// inside the manager, and also surface here as a `None` outcome).
#[derive(Debug, Clone, Default)]
pub struct CompressionReport {
    pub attempts: usize,
    pub successes: usize,
    pub failures: usize,
    pub bytes_saved: usize,
    pub by_strategy: HashMap<Strategy, usize>,
}

pub struct PostgreSQLBTree<K, V> {
    config: BTreeConfig,
    arena: Vec<Option<BTreeNode<K, V>>>,
    root: Option<NodeId>,
    total_keys: usize,
    height: usize,
    node_count: usize,
    manager: CompressionManager,
}

impl<K: CompressibleKey, V: CompressibleValue> PostgreSQLBTree<K, V> {
    /// Quick constructor named by spec section 6. `order` must be `>= 4`;
    /// violating that is `BTreeError::InvalidArgument`, not a panic.
    pub fn new(order: usize, enable_compression: bool) -> BTreeResult<Self> {
        Self::with_config(BTreeConfig::new(order, enable_compression))
    }

    /// Full constructor taking every knob in [`BTreeConfig`] (SPEC_FULL
    /// 10.3).
    pub fn with_config(config: BTreeConfig) -> BTreeResult<Self> {
        config.validate()?;
        Ok(Self {
            manager: CompressionManager::new(config.clone()),
            config,
            arena: Vec::new(),
            root: None,
            total_keys: 0,
            height: 0,
            node_count: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.total_keys
    }

    pub fn is_empty(&self) -> bool {
        self.total_keys == 0
    }

    // -----------------------------------------------------------------
    // Arena plumbing
    // -----------------------------------------------------------------

    fn alloc_node(&mut self, node: BTreeNode<K, V>) -> NodeId {
        self.arena.push(Some(node));
        self.node_count += 1;
        NodeId(self.arena.len() - 1)
    }

    fn free_node(&mut self, id: NodeId) {
        self.arena[id.0] = None;
        self.node_count -= 1;
    }

    pub(crate) fn node(&self, id: NodeId) -> &BTreeNode<K, V> {
        self.arena[id.0].as_ref().expect("node id must reference a live page")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut BTreeNode<K, V> {
        self.arena[id.0].as_mut().expect("node id must reference a live page")
    }

    pub(crate) fn materialize_node(&mut self, id: NodeId) -> BTreeResult<()> {
        let manager = &self.manager;
        let node = self.arena[id.0].as_mut().expect("node id must reference a live page");
        node.materialize(manager)
    }

    /// Finds the smallest `i` such that `key < keys[i]`, else the
    /// rightmost child — spec 4.1's insert-descent rule, reused for
    /// search, delete and range_query (4.2: "tie-break ... key >=
    /// separator goes right").
    fn descend_to_leaf(&mut self, key: &K) -> BTreeResult<NodeId> {
        let mut current = self.root.expect("descend_to_leaf requires a non-empty tree");
        loop {
            self.materialize_node(current)?;
            let node = self.node(current);
            if node.is_leaf {
                trace!("descend reached leaf {:?}", current);
                return Ok(current);
            }
            let idx = node.keys.partition_point(|k| k <= key);
            trace!("descend at internal {:?}, taking child slot {}", current, idx);
            current = node.children[idx];
        }
    }

    // -----------------------------------------------------------------
    // insert
    // -----------------------------------------------------------------

    /// Descends to the target leaf and appends in sorted order, stable
    /// among duplicates (new entries land after existing ones sharing
    /// the same key — spec's "first in insertion order" resolution of
    /// the open question on duplicate ordering). Splits on overflow.
    /// Never errors on duplicate keys.
    pub fn insert(&mut self, key: K, value: V) {
        if self.root.is_none() {
            let mut leaf = BTreeNode::new_leaf();
            leaf.entries.push(KeyValue::new(key, value));
            let id = self.alloc_node(leaf);
            self.root = Some(id);
            self.height = 1;
            self.total_keys = 1;
            return;
        }

        let leaf_id = self.descend_to_leaf(&key).expect("tree is non-empty");
        self.materialize_node(leaf_id).expect("leaf must materialize to accept an insert");
        {
            let node = self.node_mut(leaf_id);
            let pos = node.entries.partition_point(|e| e.key <= key);
            node.entries.insert(pos, KeyValue::new(key, value));
        }
        self.total_keys += 1;

        if self.node(leaf_id).entries.len() > self.config.max_entries() {
            self.split_leaf(leaf_id);
        }

        #[cfg(debug_assertions)]
        self.check_integrity();
    }

    fn split_leaf(&mut self, leaf_id: NodeId) {
        let (right_entries, old_next) = {
            let node = self.node_mut(leaf_id);
            let m = node.entries.len() / 2;
            let right_entries = node.entries.split_off(m);
            (right_entries, node.next_leaf)
        };
        let separator = right_entries[0].key.clone();

        let mut right = BTreeNode::new_leaf();
        right.entries = right_entries;
        right.next_leaf = old_next;
        right.parent = self.node(leaf_id).parent;
        let right_id = self.alloc_node(right);

        self.node_mut(leaf_id).next_leaf = Some(right_id);
        debug!("split leaf {:?} at separator key, new right page {:?}", leaf_id, right_id);

        self.insert_into_parent(leaf_id, separator, right_id);
    }

    fn split_internal(&mut self, node_id: NodeId) {
        let (promoted, right_keys, right_children) = {
            let node = self.node_mut(node_id);
            let m = node.keys.len() / 2;
            let mut tail = node.keys.split_off(m);
            let promoted = tail.remove(0);
            let right_children = node.children.split_off(m + 1);
            (promoted, tail, right_children)
        };

        let mut right = BTreeNode::new_internal();
        right.keys = right_keys;
        right.children = right_children;
        right.parent = self.node(node_id).parent;
        let right_id = self.alloc_node(right);

        let moved_children = self.node(right_id).children.clone();
        for child in moved_children {
            self.node_mut(child).parent = Some(right_id);
        }
        debug!("split internal {:?}, promoting a separator, new right page {:?}", node_id, right_id);

        self.insert_into_parent(node_id, promoted, right_id);
    }

    /// Inserts `separator` (with `right_id` as its right child) into
    /// `left_id`'s parent, right after `left_id`'s own slot. Grows a new
    /// root when `left_id` had none.
    fn insert_into_parent(&mut self, left_id: NodeId, separator: K, right_id: NodeId) {
        match self.node(left_id).parent {
            None => {
                let mut new_root = BTreeNode::new_internal();
                new_root.keys.push(separator);
                new_root.children = vec![left_id, right_id];
                let new_root_id = self.alloc_node(new_root);
                self.node_mut(left_id).parent = Some(new_root_id);
                self.node_mut(right_id).parent = Some(new_root_id);
                self.root = Some(new_root_id);
                self.height += 1;
                debug!("root split, tree height now {}", self.height);
            }
            Some(parent_id) => {
                self.node_mut(right_id).parent = Some(parent_id);
                {
                    let parent = self.node_mut(parent_id);
                    let left_index = parent
                        .children
                        .iter()
                        .position(|&c| c == left_id)
                        .expect("left child must already be present in its parent");
                    parent.keys.insert(left_index, separator);
                    parent.children.insert(left_index + 1, right_id);
                }
                if self.node(parent_id).keys.len() > self.config.max_entries() {
                    self.split_internal(parent_id);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // search
    // -----------------------------------------------------------------

    /// Collects every value stored under `key`, in traversal (insertion)
    /// order, following `next_leaf` forward while duplicates spill into
    /// the next leaf.
    pub fn search(&mut self, key: &K) -> BTreeResult<Vec<V>> {
        if self.root.is_none() {
            return Ok(Vec::new());
        }
        let leaf_id = self.descend_to_leaf(key)?;
        self.materialize_node(leaf_id)?;

        let mut results = Vec::new();
        {
            let node = self.node(leaf_id);
            let start = node.entries.partition_point(|e| &e.key < key);
            for e in &node.entries[start..] {
                if &e.key == key {
                    results.push(e.value.clone());
                } else {
                    break;
                }
            }
        }

        let mut next = self.node(leaf_id).next_leaf;
        while let Some(next_id) = next {
            self.materialize_node(next_id)?;
            let node = self.node(next_id);
            if node.entries.first().map_or(false, |e| &e.key == key) {
                for e in &node.entries {
                    if &e.key == key {
                        results.push(e.value.clone());
                    } else {
                        break;
                    }
                }
                next = node.next_leaf;
            } else {
                break;
            }
        }

        Ok(results)
    }

    // -----------------------------------------------------------------
    // delete
    // -----------------------------------------------------------------

    /// Removes the first entry matching `key` (and `value`, when given).
    /// Returns `false` without mutating anything if no entry matched.
    pub fn delete(&mut self, key: &K, value: Option<&V>) -> BTreeResult<bool> {
        if self.root.is_none() {
            return Ok(false);
        }
        let leaf_id = self.descend_to_leaf(key)?;
        self.materialize_node(leaf_id)?;

        let removed_idx = {
            let node = self.node(leaf_id);
            node.entries
                .iter()
                .position(|e| &e.key == key && value.map_or(true, |v| &e.value == v))
        };
        let idx = match removed_idx {
            Some(i) => i,
            None => return Ok(false),
        };
        self.node_mut(leaf_id).entries.remove(idx);
        self.total_keys -= 1;

        self.rebalance_after_removal(leaf_id);

        #[cfg(debug_assertions)]
        self.check_integrity();
        Ok(true)
    }

    fn rebalance_after_removal(&mut self, node_id: NodeId) {
        if self.node(node_id).parent.is_none() {
            self.fix_root();
            return;
        }

        if self.node(node_id).entry_count() >= self.config.min_entries() {
            return;
        }

        let parent_id = self.node(node_id).parent.unwrap();
        self.materialize_node(parent_id).expect("parent must materialize to rebalance");
        let idx = self
            .node(parent_id)
            .children
            .iter()
            .position(|&c| c == node_id)
            .expect("node must be a child of its own parent");

        let left_sibling = if idx > 0 { Some(self.node(parent_id).children[idx - 1]) } else { None };
        let right_sibling = if idx + 1 < self.node(parent_id).children.len() {
            Some(self.node(parent_id).children[idx + 1])
        } else {
            None
        };

        if let Some(left_id) = left_sibling {
            self.materialize_node(left_id).expect("sibling must materialize to rebalance");
            if self.node(left_id).entry_count() > self.config.min_entries() {
                debug!("borrowing from left sibling {:?} into {:?}", left_id, node_id);
                self.borrow_from_left(parent_id, idx, left_id, node_id);
                return;
            }
        }
        if let Some(right_id) = right_sibling {
            self.materialize_node(right_id).expect("sibling must materialize to rebalance");
            if self.node(right_id).entry_count() > self.config.min_entries() {
                debug!("borrowing from right sibling {:?} into {:?}", right_id, node_id);
                self.borrow_from_right(parent_id, idx, node_id, right_id);
                return;
            }
        }

        if let Some(left_id) = left_sibling {
            debug!("merging {:?} into left sibling {:?}", node_id, left_id);
            self.merge_nodes(parent_id, idx - 1, left_id, node_id);
        } else if let Some(right_id) = right_sibling {
            debug!("merging right sibling {:?} into {:?}", right_id, node_id);
            self.merge_nodes(parent_id, idx, node_id, right_id);
        }
        // A non-root page with neither sibling cannot happen: its parent
        // would have exactly one child, which `fix_root` collapses away
        // (for the root) or which `merge_nodes`'s recursive rebalance of
        // the parent would itself have resolved one level up.
    }

    fn borrow_from_left(&mut self, parent_id: NodeId, idx: usize, left_id: NodeId, node_id: NodeId) {
        if self.node(node_id).is_leaf {
            let moved = self.node_mut(left_id).entries.pop().expect("left sibling has a spare entry");
            self.node_mut(node_id).entries.insert(0, moved);
            let new_sep = self.node(node_id).entries[0].key.clone();
            self.node_mut(parent_id).keys[idx - 1] = new_sep;
        } else {
            let sep = self.node(parent_id).keys[idx - 1].clone();
            let moved_key = self.node_mut(left_id).keys.pop().expect("left sibling has a spare key");
            let moved_child = self.node_mut(left_id).children.pop().expect("left sibling has a spare child");
            {
                let node = self.node_mut(node_id);
                node.keys.insert(0, sep);
                node.children.insert(0, moved_child);
            }
            self.node_mut(parent_id).keys[idx - 1] = moved_key;
            self.node_mut(moved_child).parent = Some(node_id);
        }
    }

    fn borrow_from_right(&mut self, parent_id: NodeId, idx: usize, node_id: NodeId, right_id: NodeId) {
        if self.node(node_id).is_leaf {
            let moved = self.node_mut(right_id).entries.remove(0);
            self.node_mut(node_id).entries.push(moved);
            let new_sep = self.node(right_id).entries[0].key.clone();
            self.node_mut(parent_id).keys[idx] = new_sep;
        } else {
            let sep = self.node(parent_id).keys[idx].clone();
            let moved_key = self.node_mut(right_id).keys.remove(0);
            let moved_child = self.node_mut(right_id).children.remove(0);
            {
                let node = self.node_mut(node_id);
                node.keys.push(sep);
                node.children.push(moved_child);
            }
            self.node_mut(parent_id).keys[idx] = moved_key;
            self.node_mut(moved_child).parent = Some(node_id);
        }
    }

    /// Concatenates `right_id` into `left_id` (`left.entries + separator
    /// (internal only) + right.entries`), splices the child list, drops
    /// the separator from the parent, unlinks `right_id` from the
    /// `next_leaf` chain if it was a leaf, and recurses on the parent.
    fn merge_nodes(&mut self, parent_id: NodeId, left_idx: usize, left_id: NodeId, right_id: NodeId) {
        if self.node(left_id).is_leaf {
            let right_entries = std::mem::take(&mut self.node_mut(right_id).entries);
            let right_next = self.node(right_id).next_leaf;
            let left = self.node_mut(left_id);
            left.entries.extend(right_entries);
            left.next_leaf = right_next;
        } else {
            let sep = self.node(parent_id).keys[left_idx].clone();
            let right_keys = std::mem::take(&mut self.node_mut(right_id).keys);
            let right_children = std::mem::take(&mut self.node_mut(right_id).children);
            {
                let left = self.node_mut(left_id);
                left.keys.push(sep);
                left.keys.extend(right_keys);
                left.children.extend(right_children.iter().copied());
            }
            for child in right_children {
                self.node_mut(child).parent = Some(left_id);
            }
        }

        self.node_mut(parent_id).keys.remove(left_idx);
        self.node_mut(parent_id).children.remove(left_idx + 1);
        self.free_node(right_id);

        self.rebalance_after_removal(parent_id);
    }

    fn fix_root(&mut self) {
        let root_id = match self.root {
            Some(r) => r,
            None => return,
        };
        self.materialize_node(root_id).expect("root must materialize to check for shrinkage");
        let node = self.node(root_id);
        if node.is_leaf {
            if node.entries.is_empty() {
                self.free_node(root_id);
                self.root = None;
                self.height = 0;
            }
            return;
        }
        if node.keys.is_empty() {
            let only_child = node.children[0];
            self.node_mut(only_child).parent = None;
            self.free_node(root_id);
            self.root = Some(only_child);
            self.height -= 1;
            debug!("root shrank, tree height now {}", self.height);
        }
    }

    // -----------------------------------------------------------------
    // range_query
    // -----------------------------------------------------------------

    /// Descends to the first leaf that may contain `start`, then returns
    /// a cursor that walks `next_leaf` until the upper bound is passed
    /// (spec 4.1). `inclusive = false` excludes exact endpoint matches on
    /// both ends.
    pub fn range_query(&mut self, start: K, end: K, inclusive: bool) -> BTreeResult<RangeCursor<'_, K, V>> {
        if start > end {
            return Err(BTreeError::invalid_argument("range_query requires start <= end"));
        }
        let leaf = match self.root {
            Some(_) => Some(self.descend_to_leaf(&start)?),
            None => None,
        };
        Ok(RangeCursor::new(self, leaf, start, end, inclusive))
    }

    // -----------------------------------------------------------------
    // compression
    // -----------------------------------------------------------------

    /// Walks every live page, compressing each that isn't already
    /// compressed. A no-op when `enable_compression` is false (SPEC_FULL
    /// 10.3 / section 6).
    pub fn compress_all_pages(&mut self) -> CompressionReport {
        let mut report = CompressionReport::default();
        if !self.config.enable_compression {
            return report;
        }

        let ids: Vec<NodeId> = self
            .arena
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| NodeId(i)))
            .collect();

        let before_in = self.manager.stats().bytes_in_total();
        let before_out = self.manager.stats().bytes_out_total();

        for id in ids {
            if self.node(id).is_compressed() {
                continue;
            }
            report.attempts += 1;
            {
                let manager = &mut self.manager;
                let node = self.arena[id.0].as_mut().expect("node id must reference a live page");
                node.compress(manager);
            }
            let strategy = self
                .node(id)
                .compressed
                .as_ref()
                .expect("compress always leaves the page compressed")
                .metadata
                .strategy();
            if strategy == Strategy::None {
                report.failures += 1;
            } else {
                report.successes += 1;
                *report.by_strategy.entry(strategy).or_insert(0) += 1;
            }
        }

        let after_in = self.manager.stats().bytes_in_total();
        let after_out = self.manager.stats().bytes_out_total();
        report.bytes_saved = (after_in - before_in).saturating_sub(after_out - before_out);

        report
    }

    /// Runs the cost-model estimator over a standalone sample without
    /// committing to an encode (spec 4.3).
    pub fn get_compression_stats(&self, sample: &[KeyValue<K, V>]) -> HashMap<Strategy, f64> {
        self.manager.estimate_leaf(sample)
    }

    pub fn get_detailed_compression_stats(&self) -> &CompressionStats {
        self.manager.stats()
    }

    // -----------------------------------------------------------------
    // statistics
    // -----------------------------------------------------------------

    pub fn get_statistics(&self) -> TreeStats {
        let avg_fill_ratio = if self.node_count == 0 {
            0.0
        } else {
            let total_entries: usize = self.arena.iter().flatten().map(|n| n.entry_count()).sum();
            let capacity = self.node_count * self.config.max_entries();
            total_entries as f64 / capacity.max(1) as f64
        };
        TreeStats {
            height: self.height,
            node_count: self.node_count,
            total_keys: self.total_keys,
            avg_fill_ratio,
            compression_ratio: self.manager.stats().global_ratio(),
        }
    }

    // -----------------------------------------------------------------
    // debug-only integrity checking (I1-I7)
    // -----------------------------------------------------------------

    #[cfg(debug_assertions)]
    fn check_integrity(&mut self) {
        let root = match self.root {
            Some(r) => r,
            None => return,
        };
        let mut leaf_depth: Option<usize> = None;
        self.check_node(root, true, &mut leaf_depth, 0);
    }

    #[cfg(debug_assertions)]
    fn check_node(&mut self, id: NodeId, is_root: bool, leaf_depth: &mut Option<usize>, depth: usize) {
        self.materialize_node(id).expect("integrity check requires a materialized page");
        let node = self.node(id);
        if node.is_leaf {
            assert!(
                node.entries.windows(2).all(|w| w[0].key <= w[1].key),
                "I4 violated: leaf entries out of order"
            );
            if !is_root {
                assert!(
                    node.entries.len() >= self.config.min_entries(),
                    "I1 violated: leaf underflow ({} < {})",
                    node.entries.len(),
                    self.config.min_entries()
                );
            }
            match *leaf_depth {
                Some(d) => assert_eq!(d, depth, "I3 violated: leaves at different depths"),
                None => *leaf_depth = Some(depth),
            }
        } else {
            assert_eq!(
                node.children.len(),
                node.keys.len() + 1,
                "internal page child/key count mismatch"
            );
            assert!(
                node.keys.windows(2).all(|w| w[0] <= w[1]),
                "I4 violated: internal separators out of order"
            );
            if !is_root {
                assert!(
                    node.keys.len() >= self.config.min_entries(),
                    "I1 violated: internal underflow ({} < {})",
                    node.keys.len(),
                    self.config.min_entries()
                );
            }
            let children = node.children.clone();
            for child in children {
                assert_eq!(
                    self.node(child).parent,
                    Some(id),
                    "I6 violated: child's parent back-reference does not point here"
                );
                self.check_node(child, false, leaf_depth, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_into_empty_tree_creates_single_leaf_root() {
        let mut tree: PostgreSQLBTree<i64, String> = PostgreSQLBTree::new(4, false).unwrap();
        tree.insert(1, "a".to_string());
        let stats = tree.get_statistics();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.total_keys, 1);
    }

    #[test]
    fn rejects_small_order() {
        let result: BTreeResult<PostgreSQLBTree<i64, i64>> = PostgreSQLBTree::new(3, false);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_keys_preserve_insertion_order() {
        let mut tree: PostgreSQLBTree<String, String> = PostgreSQLBTree::new(4, false).unwrap();
        tree.insert("user_001".to_string(), "A".to_string());
        tree.insert("user_002".to_string(), "B".to_string());
        tree.insert("user_001".to_string(), "C".to_string());

        let values = tree.search(&"user_001".to_string()).unwrap();
        assert_eq!(values, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn range_scan_crosses_leaves_after_splits() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        for i in 1..=20 {
            tree.insert(i, i);
        }
        let results: Vec<(i64, i64)> = tree.range_query(5, 10, true).unwrap().collect();
        assert_eq!(results, (5..=10).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn range_scan_exclusive_excludes_endpoints() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        for i in 1..=20 {
            tree.insert(i, i);
        }
        let results: Vec<(i64, i64)> = tree.range_query(5, 10, false).unwrap().collect();
        assert_eq!(results, (6..=9).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn range_query_rejects_inverted_bounds() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        tree.insert(1, 1);
        assert!(tree.range_query(10, 1, true).is_err());
    }

    #[test]
    fn delete_driven_merges_keep_invariants() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        for i in 1..=10 {
            tree.insert(i, i);
        }
        for i in 1..=5 {
            assert!(tree.delete(&i, None).unwrap());
            assert!(tree.get_statistics().height <= 2);
        }
        assert_eq!(tree.len(), 5);
        let remaining: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();
        assert_eq!(remaining, (6..=10).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn delete_last_entry_empties_the_tree() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        tree.insert(1, 1);
        assert!(tree.delete(&1, None).unwrap());
        assert_eq!(tree.len(), 0);
        let stats = tree.get_statistics();
        assert_eq!(stats.height, 0);
        assert_eq!(stats.node_count, 0);
    }

    #[test]
    fn delete_returns_false_when_nothing_matches() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        tree.insert(1, 1);
        assert!(!tree.delete(&2, None).unwrap());
    }

    #[test]
    fn insert_then_delete_returns_to_equivalent_state() {
        let mut tree: PostgreSQLBTree<i64, i64> = PostgreSQLBTree::new(4, false).unwrap();
        for i in 1..=10 {
            tree.insert(i, i * 10);
        }
        let before: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();

        tree.insert(99, 990);
        assert!(tree.delete(&99, Some(&990)).unwrap());

        let after: Vec<(i64, i64)> = tree.range_query(i64::MIN, i64::MAX, true).unwrap().collect();
        assert_eq!(before, after);
        assert_eq!(tree.len(), 10);
    }
}
