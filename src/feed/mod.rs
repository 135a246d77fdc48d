//! Feed retrieval and normalization.
//!
//! This module turns a list of RSS and Atom feed URLs into one date-sorted
//! list of items:
//!
//! - **Fetching**: concurrent HTTP retrieval with per-request timeouts
//! - **Detection**: classify a document as RSS or Atom by its root element
//! - **Normalization**: map both dialects onto [`NormalizedItem`]
//! - **Dates**: tolerant parsing of the many date layouts feeds use
//! - **Merging**: concatenate, sort newest first, optionally cap
//!
//! # Architecture
//!
//! - [`fetcher`] - HTTP retrieval with bounded concurrency
//! - [`detect`] - root element classification
//! - [`parser`] - RSS/Atom decoding into normalized items
//! - [`date`] - the date format table
//! - [`merge`] - sorting, capping and failure collection
//!
//! # Example
//!
//! ```ignore
//! use combine_rss_feeds::feed::{collect_results, fetch_all, merge, FetchOptions};
//!
//! let results = fetch_all(&client, &urls, &FetchOptions::default()).await;
//! let collected = collect_results(results);
//! let items = merge(collected.batches, None);
//! ```

mod date;
mod detect;
mod error;
mod fetcher;
mod merge;
mod parser;

pub use date::{format_rfc1123, parse_date};
pub use detect::{detect, FeedFormat};
pub use error::FeedError;
pub use fetcher::{fetch_all, fetch_feed, FetchError, FetchOptions, FetchResult};
pub use merge::{collect_results, merge, sort_items, Collected};
pub use parser::{normalize, normalize_feed, NormalizedItem};
