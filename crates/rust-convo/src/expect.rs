//! Expectation matching module.
//!
//! This module turns expected text into matching patterns (escaped or raw,
//! with placeholders as capture groups), checks structured-data
//! assertions, and combines both with the negation flag into a verdict.

mod cache;
mod matcher;
mod pattern;
pub mod structured;

pub use cache::{CacheStats, DEFAULT_CACHE_SIZE, PatternCache};
pub use matcher::{Expectation, ExpectationMatcher, Verdict};
pub use pattern::{ExpectationPattern, PatternOptions, build_source, placeholders};
pub use structured::KeyMismatch;
