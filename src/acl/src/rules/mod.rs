//! Allow/deny rules and the rule applier
//!
//! Rules are kept in registration order. At query time the *last* matching
//! rule wins, so a later `deny` overrides an earlier `allow` for the same
//! role/resource/privilege combination.

pub mod applier;
pub mod types;

pub use applier::{RuleApplier, RuleSet};
pub use types::{AccessQuery, Assertion, AssertionFn, Rule};
