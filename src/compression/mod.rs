//! Page-level, content-aware compression.
//!
//! A page's entries are classified, a strategy is picked by a cheap cost
//! model, the winner is actually encoded, and the manager falls back to
//! [`Strategy::None`] whenever nothing pays for itself. Every strategy's
//! `encode`/`decode` pair is exactly reversible (`decode(encode(x)) == x`,
//! element-wise and in order) — see `strategies.rs` for the codecs
//! themselves and the `#[cfg(test)]` module at the bottom of this file for
//! the fingerprinting/selection logic.

mod strategies;

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};

use crate::btree::entry::{CompressibleKey, CompressibleValue, KeyValue};
use crate::config::BTreeConfig;

/// Discriminator stored alongside a compressed page identifying which
/// codec produced the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Prefix,
    Dict,
    Delta,
    Rle,
    General,
    /// Sentinel: no strategy produced an acceptable ratio, or compression
    /// is disabled. The "blob" is a plain passthrough encoding.
    None,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Strategy::Prefix => "PREFIX",
            Strategy::Dict => "DICT",
            Strategy::Delta => "DELTA",
            Strategy::Rle => "RLE",
            Strategy::General => "GENERAL",
            Strategy::None => "NONE",
        };
        write!(f, "{}", s)
    }
}

/// A page's materialized content, reduced to plain bytes, the shape the
/// compression layer actually operates on. Internal pages pass
/// `value: None` for every entry — their child pointers are live memory
/// references and are never serialized (spec 4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodableEntry {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    /// `Some` when the original key type opted into `CompressibleKey::as_i64`
    /// for this entry — the DELTA strategy's only source of numeric signal.
    pub key_int: Option<i64>,
    /// Same as `key_int`, for the value side (only meaningful when `value`
    /// is `Some`).
    pub value_int: Option<i64>,
}

impl EncodableEntry {
    pub fn from_leaf<K: CompressibleKey, V: CompressibleValue>(entries: &[KeyValue<K, V>]) -> Vec<Self> {
        entries
            .iter()
            .map(|kv| EncodableEntry {
                key: kv.key.to_bytes(),
                value: Some(kv.value.to_bytes()),
                key_int: kv.key.as_i64(),
                value_int: kv.value.as_i64(),
            })
            .collect()
    }

    pub fn from_internal<K: CompressibleKey>(keys: &[K]) -> Vec<Self> {
        keys.iter()
            .map(|k| EncodableEntry {
                key: k.to_bytes(),
                value: None,
                key_int: k.as_i64(),
                value_int: None,
            })
            .collect()
    }

    /// Builds an entry straight from decoded bytes, with no numeric hint —
    /// used by every `decode_*` codec in `strategies.rs`, which only ever
    /// hands the result back to `CompressionManager` for a `from_bytes`
    /// (or, for DELTA, an explicit `from_i64`) reconstruction.
    pub(crate) fn raw(key: Vec<u8>, value: Option<Vec<u8>>) -> Self {
        EncodableEntry {
            key,
            value,
            key_int: None,
            value_int: None,
        }
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn raw_len(&self) -> usize {
        self.key.len() + self.value.as_ref().map_or(0, |v| v.len())
    }
}

/// Per-strategy parameters needed to reverse a blob, plus enough of the
/// strategy tag to route decoding. Mirrors spec 4.3: "metadata carries the
/// chosen strategy tag and any per-strategy parameters (dictionary,
/// prefix, base value, element type)".
#[derive(Debug, Clone)]
pub enum CompressionMetadata {
    None {
        count: usize,
        has_values: bool,
    },
    Prefix {
        prefix: Vec<u8>,
        count: usize,
        has_values: bool,
    },
    Dict {
        table: Vec<Vec<u8>>,
        count: usize,
    },
    Delta {
        base: i64,
        value_base: i64,
        count: usize,
        has_values: bool,
        values_numeric: bool,
    },
    Rle {
        count: usize,
        has_values: bool,
    },
    General {
        count: usize,
        has_values: bool,
        raw_len: usize,
    },
}

impl CompressionMetadata {
    pub fn strategy(&self) -> Strategy {
        match self {
            CompressionMetadata::None { .. } => Strategy::None,
            CompressionMetadata::Prefix { .. } => Strategy::Prefix,
            CompressionMetadata::Dict { .. } => Strategy::Dict,
            CompressionMetadata::Delta { .. } => Strategy::Delta,
            CompressionMetadata::Rle { .. } => Strategy::Rle,
            CompressionMetadata::General { .. } => Strategy::General,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            CompressionMetadata::None { count, .. }
            | CompressionMetadata::Prefix { count, .. }
            | CompressionMetadata::Dict { count, .. }
            | CompressionMetadata::Delta { count, .. }
            | CompressionMetadata::Rle { count, .. }
            | CompressionMetadata::General { count, .. } => *count,
        }
    }
}

/// An opaque compressed payload. The manager never inspects its contents
/// except through the strategy named by the accompanying
/// [`CompressionMetadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlob(pub Vec<u8>);

#[derive(Debug, Clone, Default)]
pub struct StrategyStats {
    pub count: usize,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

/// Running counters kept by a [`CompressionManager`]. `attempts` counts
/// every call to `compress`; `successes` counts the ones that committed
/// to something other than [`Strategy::None`].
#[derive(Debug, Clone, Default)]
pub struct CompressionStats {
    pub attempts: usize,
    pub successes: usize,
    pub by_strategy: HashMap<Strategy, StrategyStats>,
}

impl CompressionStats {
    pub fn bytes_in_total(&self) -> usize {
        self.by_strategy.values().map(|s| s.bytes_in).sum()
    }

    pub fn bytes_out_total(&self) -> usize {
        self.by_strategy.values().map(|s| s.bytes_out).sum()
    }

    /// `sum(compressed_bytes) / sum(original_bytes)` across every
    /// strategy that actually committed. `None` when nothing has
    /// compressed yet (avoids a division by zero reading as "perfect
    /// compression").
    pub fn global_ratio(&self) -> Option<f64> {
        let bytes_in = self.bytes_in_total();
        if bytes_in == 0 {
            return None;
        }
        Some(self.bytes_out_total() as f64 / bytes_in as f64)
    }
}

/// Classifies a page's entries, picks a strategy, encodes, and reverses
/// the transform. Holds no page state of its own beyond the running
/// [`CompressionStats`] — the blob and its metadata live on the
/// [`crate::btree::node::BTreeNode`] that owns them.
pub struct CompressionManager {
    config: BTreeConfig,
    stats: CompressionStats,
}

impl CompressionManager {
    pub fn new(config: BTreeConfig) -> Self {
        Self {
            config,
            stats: CompressionStats::default(),
        }
    }

    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// Runs the cost-model estimator for every applicable strategy over a
    /// leaf page's entries without committing to an encode. Exposed
    /// standalone so callers can preview the manager's choice (spec 4.3,
    /// `get_compression_stats(sample)`).
    pub fn estimate_leaf<K: CompressibleKey, V: CompressibleValue>(
        &self,
        entries: &[KeyValue<K, V>],
    ) -> HashMap<Strategy, f64> {
        let entries = EncodableEntry::from_leaf(entries);
        let fp = strategies::Fingerprint::compute(&entries);
        strategies::estimate_all(&entries, &fp, &self.config)
    }

    /// Same as [`Self::estimate_leaf`], for an internal page's separator
    /// keys.
    pub fn estimate_internal<K: CompressibleKey>(&self, keys: &[K]) -> HashMap<Strategy, f64> {
        let entries = EncodableEntry::from_internal(keys);
        let fp = strategies::Fingerprint::compute(&entries);
        strategies::estimate_all(&entries, &fp, &self.config)
    }

    /// Compresses a leaf page's entries.
    pub fn compress_leaf<K: CompressibleKey, V: CompressibleValue>(
        &mut self,
        entries: &[KeyValue<K, V>],
    ) -> (CompressedBlob, CompressionMetadata) {
        self.compress_entries(EncodableEntry::from_leaf(entries))
    }

    /// Compresses an internal page's separator keys. Child pointers are
    /// never part of the payload (spec 4.4).
    pub fn compress_internal<K: CompressibleKey>(
        &mut self,
        keys: &[K],
    ) -> (CompressedBlob, CompressionMetadata) {
        self.compress_entries(EncodableEntry::from_internal(keys))
    }

    fn compress_entries(&mut self, entries: Vec<EncodableEntry>) -> (CompressedBlob, CompressionMetadata) {
        self.stats.attempts += 1;

        let raw_len: usize = entries.iter().map(|e| e.raw_len()).sum();
        let count = entries.len();
        let has_values = entries.first().map_or(true, |e| e.has_value());

        if count == 0 {
            let metadata = CompressionMetadata::None { count, has_values };
            return (CompressedBlob(Vec::new()), metadata);
        }

        let fp = strategies::Fingerprint::compute(&entries);
        let estimates = strategies::estimate_all(&entries, &fp, &self.config);

        let chosen = strategies::pick_best(&estimates, self.config.estimated_acceptance_ratio);

        let (blob, metadata) = match chosen {
            Some(strategy) => match strategies::encode(strategy, &entries, &fp) {
                Ok(result) => result,
                Err(err) => {
                    warn!("compression strategy {} failed to encode, downgrading to NONE: {}", strategy, err);
                    strategies::encode_none(&entries)
                }
            },
            None => strategies::encode_none(&entries),
        };

        let actual_ratio = if raw_len == 0 {
            1.0
        } else {
            blob.0.len() as f64 / raw_len as f64
        };

        let (blob, metadata) = if metadata.strategy() != Strategy::None
            && actual_ratio >= self.config.actual_acceptance_ratio
        {
            debug!(
                "discarding {} (actual ratio {:.3} >= acceptance {:.3}), storing NONE",
                metadata.strategy(),
                actual_ratio,
                self.config.actual_acceptance_ratio
            );
            strategies::encode_none(&entries)
        } else {
            (blob, metadata)
        };

        let strategy = metadata.strategy();
        if strategy != Strategy::None {
            self.stats.successes += 1;
            let entry = self.stats.by_strategy.entry(strategy).or_default();
            entry.count += 1;
            entry.bytes_in += raw_len;
            entry.bytes_out += blob.0.len();
        }

        (blob, metadata)
    }

    /// Reverses a compressed blob into leaf entries.
    ///
    /// DELTA is the one strategy whose decoded bytes are not the original
    /// type's native encoding: keys (and numeric values) come back as
    /// canonical 8-byte big-endian `i64`s reconstructed from cumulative
    /// sums, so they are routed through `from_i64` instead of `from_bytes`.
    pub fn decompress_leaf<K: CompressibleKey, V: CompressibleValue>(
        &self,
        blob: &CompressedBlob,
        metadata: &CompressionMetadata,
    ) -> Result<Vec<KeyValue<K, V>>, String> {
        let entries = strategies::decode(blob, metadata)?;
        let values_numeric = matches!(metadata, CompressionMetadata::Delta { values_numeric: true, .. });
        let is_delta = matches!(metadata, CompressionMetadata::Delta { .. });

        entries
            .into_iter()
            .map(|e| {
                let value = e
                    .value
                    .ok_or_else(|| "leaf entry missing value after decompression".to_string())?;
                let key = if is_delta {
                    K::from_i64(i64::from_be_bytes(
                        e.key[..8].try_into().map_err(|_| "delta key is not 8 bytes".to_string())?,
                    ))
                } else {
                    K::from_bytes(&e.key)
                };
                let value = if is_delta && values_numeric {
                    V::from_i64(i64::from_be_bytes(
                        value[..8].try_into().map_err(|_| "delta value is not 8 bytes".to_string())?,
                    ))
                } else {
                    V::from_bytes(&value)
                };
                Ok(KeyValue::new(key, value))
            })
            .collect()
    }

    /// Reverses a compressed blob into internal-page separator keys.
    pub fn decompress_internal<K: CompressibleKey>(
        &self,
        blob: &CompressedBlob,
        metadata: &CompressionMetadata,
    ) -> Result<Vec<K>, String> {
        let entries = strategies::decode(blob, metadata)?;
        let is_delta = matches!(metadata, CompressionMetadata::Delta { .. });
        Ok(entries
            .into_iter()
            .map(|e| {
                if is_delta {
                    K::from_i64(i64::from_be_bytes(e.key[..8].try_into().expect("delta key is 8 bytes")))
                } else {
                    K::from_bytes(&e.key)
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> CompressionManager {
        CompressionManager::new(BTreeConfig::default())
    }

    #[test]
    fn prefix_strategy_round_trips_and_compresses() {
        let mut m = mgr();
        let entries: Vec<KeyValue<String, String>> = (1..=8)
            .map(|i| KeyValue::new(format!("user_{:03}", i), "x".to_string()))
            .collect();

        let (blob, metadata) = m.compress_leaf(&entries);
        assert_eq!(metadata.strategy(), Strategy::Prefix);
        assert!(blob.0.len() < entries.iter().map(|e| e.key.len() + e.value.len()).sum());

        let decoded: Vec<KeyValue<String, String>> = m.decompress_leaf(&blob, &metadata).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn delta_strategy_round_trips_monotonic_ints() {
        let mut m = mgr();
        let entries: Vec<KeyValue<i64, i64>> = (1000..1128).map(|i| KeyValue::new(i, i)).collect();

        let (blob, metadata) = m.compress_leaf(&entries);
        assert_eq!(metadata.strategy(), Strategy::Delta);

        let raw_len: usize = entries.iter().map(|e| 16usize).sum();
        let ratio = blob.0.len() as f64 / raw_len as f64;
        assert!(ratio <= 0.3, "expected ratio <= 0.3, got {}", ratio);

        let decoded: Vec<KeyValue<i64, i64>> = m.decompress_leaf(&blob, &metadata).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn rejects_low_gain_random_payload() {
        let mut m = mgr();
        let entries: Vec<KeyValue<String, String>> = (0..16)
            .map(|i| {
                // 20-byte high-entropy-looking strings, no shared prefix.
                let k = format!("{:x}{:x}{:x}{:x}{:x}", i * 7919, i * 104729, i + 3, i * 13, i * 97);
                (k.clone(), k)
            })
            .map(|(k, v)| KeyValue::new(k, v))
            .collect();

        let (_, metadata) = m.compress_leaf(&entries);
        assert_eq!(metadata.strategy(), Strategy::None);
        assert_eq!(m.stats().attempts, 1);
        assert_eq!(m.stats().successes, 0);
    }

    #[test]
    fn dict_strategy_round_trips_repeated_values() {
        let mut m = mgr();
        // Digit-reversed keys so no 4-byte common prefix forms (which would
        // make PREFIX win the estimate instead) and the key type opts out
        // of the DELTA numeric hint, leaving the repeated values as the
        // only exploitable redundancy.
        let entries: Vec<KeyValue<String, String>> = (0..40)
            .map(|i| {
                let key: String = i.to_string().chars().rev().collect();
                let value = ["red", "green", "blue"][(i % 3) as usize].to_string();
                KeyValue::new(key, value)
            })
            .collect();

        let (blob, metadata) = m.compress_leaf(&entries);
        assert_eq!(metadata.strategy(), Strategy::Dict);

        let decoded: Vec<KeyValue<String, String>> = m.decompress_leaf(&blob, &metadata).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn rle_strategy_round_trips_runs() {
        let mut m = mgr();
        let mut entries = Vec::new();
        for i in 0..30i64 {
            // Digit-reversed keys, same reasoning as the DICT test above:
            // small sequential i64 keys would tie PREFIX/DELTA's estimate
            // against RLE's, so use a key type that opts out of both.
            let key: String = i.to_string().chars().rev().collect();
            let v = if i < 25 { "ok".to_string() } else { "err".to_string() };
            entries.push(KeyValue::new(key, v));
        }

        let (blob, metadata) = m.compress_leaf(&entries);
        assert_eq!(metadata.strategy(), Strategy::Rle);

        let decoded: Vec<KeyValue<String, String>> = m.decompress_leaf(&blob, &metadata).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn internal_page_keys_compress_without_values() {
        let mut m = mgr();
        let keys: Vec<String> = (1..=8).map(|i| format!("user_{:03}", i)).collect();

        let (blob, metadata) = m.compress_internal(&keys);
        assert_eq!(metadata.strategy(), Strategy::Prefix);

        let decoded: Vec<String> = m.decompress_internal(&blob, &metadata).unwrap();
        assert_eq!(decoded, keys);
    }
}
