//! Merge RSS 2.0 and Atom feeds into a single date-sorted RSS 2.0 document.
//!
//! - [`feed`] fetches feeds and normalizes them into one item shape
//! - [`output`] builds and writes the merged RSS document
//! - [`config`] loads run settings from a TOML file, CLI flags and `INPUT_*`
//!   environment variables

pub mod config;
pub mod feed;
pub mod output;
pub mod util;
