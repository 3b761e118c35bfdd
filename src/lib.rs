//! An in-memory, PostgreSQL-style B-tree index with multi-strategy page
//! compression.
//!
//! [`PostgreSQLBTree`] is an ordered multimap from keys to values:
//! point lookup (`search`), range scan (`range_query`), insertion
//! (`insert`), and deletion with rebalancing (`delete`). Individual pages
//! can be compressed in place by [`PostgreSQLBTree::compress_all_pages`],
//! which classifies each page's payload and picks the best-fitting of
//! five reversible strategies (prefix, dictionary, delta, run-length,
//! deflate-family) through [`compression::CompressionManager`].
//!
//! No durable storage, WAL, MVCC, or concurrency control — this is a
//! single-threaded, single-process in-memory engine.

pub mod btree;
pub mod compression;
pub mod config;
pub mod error;
pub mod log;

pub use btree::cursor::RangeCursor;
pub use btree::entry::{CompressibleKey, CompressibleValue, KeyValue};
pub use btree::tree::{CompressionReport, PostgreSQLBTree, TreeStats};
pub use compression::{CompressionStats, Strategy};
pub use config::BTreeConfig;
pub use error::{BTreeError, BTreeResult};
