//! Selector synthesis and robustness
//!
//! This module provides:
//! - Classification of build-generated and utility class tokens
//! - Stable marker and robust selector construction from live elements
//! - Selector rewriting (simplification, structural patterns)
//! - Fallback chains that degrade from specific to general selectors
//! - Validation reports for a selector against a document

mod builder;
mod chain;
mod generated;
mod pattern;
mod validate;

pub use builder::{build_robust_selector, is_very_stable, stable_marker};
pub use chain::{build_fallback_chain, SelectorChain};
pub use generated::{is_likely_generated, is_utility_class};
pub use pattern::{extract_structural_pattern, simplify_selector, tag_only_pattern};
pub use validate::{validate_selector, SelectorReport};

pub(crate) use validate::collapse_whitespace;
