// ============================================================================
// Operators Module
// Operator sets, evaluation policies and the shared unit rule table
// ============================================================================

mod operator;
mod policy;
mod rules;

pub use operator::{BinaryOp, UnaryOp, DEGREES_TO_RADIANS, RADIANS_TO_DEGREES};
pub use policy::{ErrorMode, SamplingMode};
pub use rules::{binary_units, unary_units, BinaryUnitRule, UnaryUnitRule};
