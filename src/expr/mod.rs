//! Embedded expressions using CEL (Common Expression Language).

mod cel;

pub use self::cel::{CelContext, CelProgram, coerce_bool, compile_cel, evaluate_cel};
