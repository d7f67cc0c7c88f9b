// ============================================================================
// Types Module
// Structural type system for quantities, tuples, functions and sets
// ============================================================================
//
// This module provides:
// - RealType / TextType: nominal scalar types
// - RealTupleType, TupleType, FunctionType, SetType and the MathType sum
// - TypeRegistry: name-indexed store so lookups find the same logical type
// - NamePool: fresh-name source threaded through one expression typing
// - a canonical printer and its left-inverse parser
//
// Equality comes in three flavours: `equals` (nominal), `equals_except_name`
// (structural) and `equals_except_name_but_units` (structural with
// convertible units).

mod math_type;
mod parse;
#[cfg(feature = "serde")]
pub(crate) mod repr;
mod scalar;

pub use math_type::{FunctionType, MathType, RealTupleType, SetType, TupleType};
pub use scalar::{NamePool, RealType, TextType, TypeRegistry};
