// ============================================================================
// Sets Module
// Domain sample sets and range discretizations
// ============================================================================

mod discretization;
mod domain;
mod kdtree;

pub use discretization::Discretization;
pub use domain::{DomainSet, Interpolation, IrregularPoints, Linear1D, Topology};
