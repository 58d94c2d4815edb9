//! MapCSS selector conditions and their evaluation context.
//!
//! A [`Condition`] is one atomic clause of a selector (`[highway=primary]`,
//! `[!name]`, `:closed`, ...). It is built once, validated on construction,
//! and evaluated against a [`Context`] that names the primitive being matched
//! and, for child selectors like `relation >[role=outer] way`, the parent
//! relation and member index.

mod condition;
mod context;
mod error;
mod op;

pub use condition::{
    Condition, ExpressionCondition, KeyCondition, KeyValueCondition, PseudoClass,
    PseudoClassCondition,
};
pub use context::{Context, Mode};
pub use error::{ConditionError, Result};
pub use op::Op;
