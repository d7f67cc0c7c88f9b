// ============================================================================
// Field Module
// Columnar field engine: packed storage, arithmetic, resampling, derivatives
// ============================================================================
//
// This module provides:
// - PackedColumn / StorageCode: quantized or floating per-component storage
// - FlatField: a flat function sampled over a DomainSet
// - vectorized binary/unary operators sharing the scalar rule table
// - nearest-neighbour and weighted resampling with frame transforms
// - partial derivatives over lattices and irregular sets

mod arithmetic;
mod derivative;
mod flat_field;
mod parallel;
mod resample;
mod storage;

pub use arithmetic::Operand;
pub use flat_field::{FlatField, FlatFieldBuilder};
pub use storage::{PackedColumn, StorageCode};
