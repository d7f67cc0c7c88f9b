// ============================================================================
// Scalar Module
// Unit- and error-aware arithmetic on single quantities and tuples
// ============================================================================

mod real;
mod tuple;

pub use real::Real;
pub use tuple::RealTuple;
