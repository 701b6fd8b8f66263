//! Open-data feed handling.
//!
//! The opérateurs bio dataset is published as a semicolon-separated CSV
//! snapshot encoded in ISO-8859-3. This module covers both halves of the
//! pipeline that turns it into store-ready records: [`source`] fetches the
//! raw byte stream, [`normalizer`] decodes and cleans it row by row.

pub mod normalizer;
pub mod source;

pub use normalizer::{DiscardReason, NormalizeError, RowOutcome, normalize_feed};
pub use source::{FeedError, FeedSource, HttpFeedSource};
