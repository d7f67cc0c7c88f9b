// ============================================================================
// Error Taxonomy
// Every failure the unit algebra, type system and field engine can report
// ============================================================================

use thiserror::Error;

/// Errors raised by the unit algebra, the type system and the field engine.
///
/// All of them are deterministic functions of input shape or type; nothing
/// in the crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitFieldError {
    /// A MathType constructor's invariants are violated
    #[error("malformed type: {0}")]
    MalformedType(String),

    /// An operation needs convertible units and none exist
    #[error("incompatible unit operation: {0}")]
    IncompatibleUnitOperation(String),

    /// Conversion between units with different base dimensions
    #[error("unit conversion error: {0}")]
    UnitConversion(String),

    /// Array lengths, tuple dimensions or sample counts disagree
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An index or value falls outside a component's discretization
    #[error("discretization error: {0}")]
    Discretization(String),

    /// Engine configuration could not be read or validated
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UnitFieldError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedType(msg.into())
    }

    pub(crate) fn incompatible(msg: impl Into<String>) -> Self {
        Self::IncompatibleUnitOperation(msg.into())
    }

    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        Self::UnitConversion(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub(crate) fn discretization(msg: impl Into<String>) -> Self {
        Self::Discretization(msg.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, UnitFieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            UnitFieldError::shape("3 != 4").to_string(),
            "shape mismatch: 3 != 4"
        );
        assert_eq!(
            UnitFieldError::conversion("m -> s").to_string(),
            "unit conversion error: m -> s"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            UnitFieldError::malformed("x"),
            UnitFieldError::MalformedType("x".to_string())
        );
        assert_ne!(
            UnitFieldError::malformed("x"),
            UnitFieldError::incompatible("x")
        );
    }
}
