use crate::error::{BTreeError, BTreeResult};

/// Default branching factor, matching spec's `order` default.
pub const DEFAULT_ORDER: usize = 256;

/// Below this payload size a page is never handed to the general-purpose
/// (deflate-family) strategy — the fixed stream overhead dominates.
pub const DEFAULT_MIN_PAYLOAD_FOR_GENERAL: usize = 128;

/// Reject a strategy whose *estimated* compressed/original ratio is
/// worse than this before paying for the actual encode.
pub const DEFAULT_ESTIMATED_ACCEPTANCE_RATIO: f64 = 0.9;

/// Reject the *actual* encode result (discard and store NONE) when the
/// realized ratio is no better than this.
pub const DEFAULT_ACTUAL_ACCEPTANCE_RATIO: f64 = 0.95;

/// Tunables for a [`crate::btree::tree::PostgreSQLBTree`], built the way
/// `fjall`'s `Config` builds up a block-compression policy: a small
/// struct with `with_*` setters returning `Self`.
#[derive(Debug, Clone)]
pub struct BTreeConfig {
    pub order: usize,
    pub enable_compression: bool,
    pub min_payload_for_general: usize,
    pub estimated_acceptance_ratio: f64,
    pub actual_acceptance_ratio: f64,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            enable_compression: true,
            min_payload_for_general: DEFAULT_MIN_PAYLOAD_FOR_GENERAL,
            estimated_acceptance_ratio: DEFAULT_ESTIMATED_ACCEPTANCE_RATIO,
            actual_acceptance_ratio: DEFAULT_ACTUAL_ACCEPTANCE_RATIO,
        }
    }
}

impl BTreeConfig {
    pub fn new(order: usize, enable_compression: bool) -> Self {
        Self {
            order,
            enable_compression,
            ..Default::default()
        }
    }

    pub fn with_min_payload_for_general(mut self, bytes: usize) -> Self {
        self.min_payload_for_general = bytes;
        self
    }

    pub fn with_estimated_acceptance_ratio(mut self, ratio: f64) -> Self {
        self.estimated_acceptance_ratio = ratio;
        self
    }

    pub fn with_actual_acceptance_ratio(mut self, ratio: f64) -> Self {
        self.actual_acceptance_ratio = ratio;
        self
    }

    pub fn validate(&self) -> BTreeResult<()> {
        if self.order < 4 {
            return Err(BTreeError::invalid_argument(format!(
                "order must be >= 4, got {}",
                self.order
            )));
        }
        Ok(())
    }

    /// `min = ceil(order/2) - 1`, the underflow threshold of spec 4.2.
    pub fn min_entries(&self) -> usize {
        (self.order + 1) / 2 - 1
    }

    /// `order - 1`, the maximum number of entries a page may hold once
    /// it is no longer transiently oversized from an insert.
    pub fn max_entries(&self) -> usize {
        self.order - 1
    }
}
