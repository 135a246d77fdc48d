//! Utility functions for common operations.
//!
//! - **Source labels**: [`hostname`] derives the bracketed tag prefixed to
//!   every merged item title

mod hostname;

pub use hostname::hostname;
