//! Style rules compiled from YAML.
//!
//! Each clause of a rule becomes one [`Condition`](crate::mapcss::Condition);
//! a rule holds when all of its clauses hold.

mod ruleset;

pub use ruleset::{LinkRule, Rule, RuleSet, compile_clause};
