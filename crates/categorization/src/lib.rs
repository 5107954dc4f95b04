//! Rule-based movement categorization with confidence scoring.
//!
//! The engine holds an ordered, active-only view over built-in default
//! rules plus rules supplied by an external store (global or scoped to an
//! account). Categorization never fails: every movement terminates in a
//! best-effort bucket, down to a fixed low-confidence default.

pub mod defaults;
pub mod engine;
pub mod heuristics;
pub mod store;

pub use crate::defaults::default_rules;
pub use crate::engine::{categorize_with_rules, CategorizationEngine};
pub use crate::store::{InMemoryRuleStore, RuleStore};
