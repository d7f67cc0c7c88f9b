// ============================================================================
// Coordinates Module
// Coordinate systems and frame-to-frame transforms
// ============================================================================

mod system;
mod transform;

pub(crate) use system::invert;
pub use system::{CoordinateSystem, Transform};
pub use transform::{transform_coordinates, transform_errors, transform_vectors, Frame};
