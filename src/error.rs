use std::{error::Error, fmt};

/// Error taxonomy for the parts of the engine that are allowed to
/// surface a failure to the caller.
///
/// `NotFound` is intentionally absent: `delete` reports a missing entry
/// as `Ok(false)`, never as an error. `CompressionFailure` is absent too:
/// the compression manager absorbs encode failures internally and
/// downgrades to the `NONE` strategy, recording the failure only in its
/// statistics (see `CompressionStats`).
#[derive(Debug)]
pub enum BTreeError {
    /// `order < 4`, `range_query` called with `start > end`, or keys that
    /// refuse to compare.
    InvalidArgument(String),

    /// A page's stored metadata does not match its blob on materialize.
    /// Treated as fatal: in this in-memory design it indicates memory
    /// corruption rather than a recoverable condition.
    Decompression(String),
}

impl BTreeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        BTreeError::InvalidArgument(msg.into())
    }

    pub fn decompression(msg: impl Into<String>) -> Self {
        BTreeError::Decompression(msg.into())
    }
}

impl fmt::Display for BTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BTreeError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            BTreeError::Decompression(msg) => write!(f, "decompression failure: {}", msg),
        }
    }
}

impl Error for BTreeError {}

pub type BTreeResult<T> = Result<T, BTreeError>;
