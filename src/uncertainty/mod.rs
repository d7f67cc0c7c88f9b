// ============================================================================
// Uncertainty Module
// Error estimates attached to quantities and field components
// ============================================================================
//
// An absent estimate means "untracked", not "zero". Propagation is selected
// by `ErrorMode`:
// - Independent: quadrature sum of the unit-normalized terms
// - Dependent: linear sum of absolute terms
// - NoErrors: results carry no estimate

mod estimate;

pub use estimate::{binary_error, combine_errors, unary_error, ErrorEstimate};
