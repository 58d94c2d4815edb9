//! MapCSS condition matching for OSM data.
//!
//! The core lives in [`mapcss`]: validated, immutable [`Condition`]s evaluated
//! against an evaluation [`Context`]. The other modules are a thin caller
//! around it: an entity [`model`], a YAML rule loader ([`config`],
//! [`rules`]) and a parallel matching driver ([`pipeline`]).

pub mod config;
pub mod expr;
pub mod mapcss;
pub mod model;
pub mod pipeline;
pub mod rules;
pub mod utils;

pub use mapcss::{Condition, ConditionError, Context, Mode, Op};
pub use model::{DataSet, Primitive};
