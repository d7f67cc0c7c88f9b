// ============================================================================
// Units Module
// Immutable physical units and conversion between them
// ============================================================================
//
// This module provides:
// - Unit: wildcard, base, derived, scaled and offset units
// - Exponent: exact rational exponents for derived-unit factors
// - catalog: SI base units, angle and temperature scales
// - can_convert / convert_values: helpers that understand absent units
//
// Offset units cannot be multiplied, divided or raised to a power; their
// `absolute()` form can.

pub mod catalog;
mod exponent;
mod unit;

pub use exponent::Exponent;
pub use unit::{
    can_convert, convert_values, convert_values_in_place, unit_label, BaseUnit, DerivedUnit,
    Factor, OffsetUnit, ScaledUnit, Unit,
};
