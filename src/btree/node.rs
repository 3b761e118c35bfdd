//! A single page: either a leaf holding key/value entries or an internal
//! page holding separator keys and child references. Pages live in the
//! tree's arena (`Vec<Option<BTreeNode<K, V>>>`, see `tree.rs`) and refer
//! to each other by [`NodeId`], a non-owning index — the owning graph is
//! strictly the arena itself, matching the "arena index or weak handle"
//! design note for `parent`/`next_leaf` back-references.

use crate::btree::entry::{CompressibleKey, CompressibleValue, KeyValue};
use crate::compression::{CompressedBlob, CompressionManager, CompressionMetadata};
use crate::error::{BTreeError, BTreeResult};

/// Index into a tree's arena. Never dereferenced after the page it names
/// has been merged away and freed — callers that hold a stale `NodeId`
/// across such a removal have a bug, not this type's problem to prevent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub(crate) struct CompressedState {
    pub blob: CompressedBlob,
    pub metadata: CompressionMetadata,
}

/// A page. `entries` is populated only for a materialized leaf; `keys`
/// only for a materialized internal page. `children` is never cleared by
/// compression — child pointers are live arena indices, not serializable
/// payload (spec 4.4).
#[derive(Debug)]
pub(crate) struct BTreeNode<K, V> {
    pub is_leaf: bool,
    pub entries: Vec<KeyValue<K, V>>,
    pub keys: Vec<K>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub next_leaf: Option<NodeId>,
    pub compressed: Option<CompressedState>,
}

impl<K, V> BTreeNode<K, V> {
    pub fn new_leaf() -> Self {
        Self {
            is_leaf: true,
            entries: Vec::new(),
            keys: Vec::new(),
            children: Vec::new(),
            parent: None,
            next_leaf: None,
            compressed: None,
        }
    }

    pub fn new_internal() -> Self {
        Self {
            is_leaf: false,
            entries: Vec::new(),
            keys: Vec::new(),
            children: Vec::new(),
            parent: None,
            next_leaf: None,
            compressed: None,
        }
    }

    /// Number of logical entries (leaf) or separator keys (internal),
    /// readable without paying for a materialize: compressed metadata
    /// carries its own `count`.
    pub fn entry_count(&self) -> usize {
        match &self.compressed {
            Some(state) => state.metadata.count(),
            None => {
                if self.is_leaf {
                    self.entries.len()
                } else {
                    self.keys.len()
                }
            }
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed.is_some()
    }
}

impl<K: CompressibleKey, V: CompressibleValue> BTreeNode<K, V> {
    /// Restores `entries`/`keys` from the compressed blob if this page is
    /// currently compressed. Idempotent: a no-op when already
    /// materialized (spec 4.4, I5).
    pub fn materialize(&mut self, manager: &CompressionManager) -> BTreeResult<()> {
        if let Some(state) = self.compressed.take() {
            if self.is_leaf {
                let entries = manager
                    .decompress_leaf::<K, V>(&state.blob, &state.metadata)
                    .map_err(BTreeError::decompression)?;
                self.entries = entries;
            } else {
                let keys = manager
                    .decompress_internal::<K>(&state.blob, &state.metadata)
                    .map_err(BTreeError::decompression)?;
                self.keys = keys;
            }
        }
        Ok(())
    }

    /// Serializes the current entries/keys through `manager` and clears
    /// the materialized vector to free its memory. A no-op if the page is
    /// already compressed — callers (`compress_all_pages`) are expected
    /// to check `is_compressed` themselves so they can count a skip
    /// rather than silently doing nothing.
    pub fn compress(&mut self, manager: &mut CompressionManager) {
        if self.compressed.is_some() {
            return;
        }
        let (blob, metadata) = if self.is_leaf {
            manager.compress_leaf(&self.entries)
        } else {
            manager.compress_internal(&self.keys)
        };
        self.compressed = Some(CompressedState { blob, metadata });
        if self.is_leaf {
            self.entries = Vec::new();
        } else {
            self.keys = Vec::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BTreeConfig;

    #[test]
    fn compress_then_materialize_round_trips_leaf() {
        let mut manager = CompressionManager::new(BTreeConfig::default());
        let mut node: BTreeNode<i64, i64> = BTreeNode::new_leaf();
        node.entries = (0..40).map(|i| KeyValue::new(i, i)).collect();

        node.compress(&mut manager);
        assert!(node.is_compressed());
        assert!(node.entries.is_empty());
        assert_eq!(node.entry_count(), 40);

        node.materialize(&manager).unwrap();
        assert!(!node.is_compressed());
        assert_eq!(node.entries.len(), 40);
        assert_eq!(node.entries[0].key, 0);
    }

    #[test]
    fn materialize_on_uncompressed_node_is_a_no_op() {
        let manager = CompressionManager::new(BTreeConfig::default());
        let mut node: BTreeNode<i64, i64> = BTreeNode::new_leaf();
        node.entries.push(KeyValue::new(1, 1));
        node.materialize(&manager).unwrap();
        assert_eq!(node.entries.len(), 1);
    }
}
