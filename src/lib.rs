// ============================================================================
// Unitfield Library
// Unit-aware typed quantities and quantized columnar fields
// ============================================================================

//! # Unitfield
//!
//! Physical quantities that carry their type, unit and error estimate
//! through arithmetic, and sampled functions ("fields") that store their
//! range columns packed into the narrowest integer code a discretization
//! allows.
//!
//! ## Features
//!
//! - **Unit algebra** in a canonical `(v + offset) * scale` form with
//!   exact rational exponents
//! - **Nominal type system** with a printable, parseable canonical form
//! - **Error propagation** for every binary and unary operator, in
//!   independent or dependent mode
//! - **Quantized storage**: byte, short or int codes with a reserved
//!   missing sentinel, or plain float columns
//! - **Resampling and derivatives** over linear lattices and irregular
//!   point sets, with coordinate-system aware operands
//!
//! ## Example
//!
//! ```rust
//! use unitfield::prelude::*;
//!
//! let temp = RealType::new("DocTemp", Some(catalog::kelvin()), false)?;
//! let temp_f = RealType::new("DocTempF", Some(catalog::fahrenheit()), false)?;
//!
//! // 32 °F is converted to kelvin before the addition
//! let sum = Real::new(temp.clone(), 300.0).binary(
//!     &Real::new(temp_f, 32.0),
//!     BinaryOp::Add,
//!     &temp,
//!     ErrorMode::Independent,
//! )?;
//! assert!((sum.value() - 573.15).abs() < 1e-9);
//!
//! // A temperature series sampled once per second
//! let time = RealTupleType::new(vec![RealType::new("DocTime", Some(catalog::second()), false)?])?;
//! let ft = FunctionType::new(MathType::RealTuple(time.clone()), MathType::Real(temp))?;
//! let field = FlatField::new(ft, DomainSet::linear_1d(time, 0.0, 2.0, 3)?)?;
//! field.set_samples(&[vec![270.0, 280.0, 290.0]], None)?;
//! assert_eq!(field.sample(1)?, vec![280.0]);
//! # Ok::<(), unitfield::error::UnitFieldError>(())
//! ```

pub mod config;
pub mod coords;
pub mod error;
pub mod field;
pub mod ops;
pub mod scalar;
pub mod sets;
pub mod types;
pub mod uncertainty;
pub mod units;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{EngineConfig, FloatStorage};
    pub use crate::coords::{CoordinateSystem, Frame, Transform};
    pub use crate::error::{Result, UnitFieldError};
    pub use crate::field::{FlatField, FlatFieldBuilder, Operand, StorageCode};
    pub use crate::ops::{BinaryOp, ErrorMode, SamplingMode, UnaryOp};
    pub use crate::scalar::{Real, RealTuple};
    pub use crate::sets::{Discretization, DomainSet, Linear1D};
    pub use crate::types::{FunctionType, MathType, NamePool, RealTupleType, RealType, TypeRegistry};
    pub use crate::uncertainty::ErrorEstimate;
    pub use crate::units::{catalog, Unit};
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use std::sync::Arc;

    fn plane() -> RealTupleType {
        RealTupleType::new(vec![
            RealType::new("LibEast", Some(catalog::meter()), false).unwrap(),
            RealType::new("LibNorth", Some(catalog::meter()), false).unwrap(),
        ])
        .unwrap()
    }

    fn grid(n: usize) -> Arc<DomainSet> {
        Arc::new(
            DomainSet::linear(
                plane(),
                vec![Linear1D::new(0.0, 3.0, n).unwrap(), Linear1D::new(0.0, 3.0, n).unwrap()],
            )
            .unwrap(),
        )
    }

    fn surface(name: &str) -> FunctionType {
        let range = RealType::new(name, Some(catalog::kelvin()), false).unwrap();
        FunctionType::new(MathType::RealTuple(plane()), MathType::Real(range)).unwrap()
    }

    #[test]
    fn test_end_to_end_mixed_temperature_scales() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let k = RealType::new("LibKelvin", Some(catalog::kelvin()), false).unwrap();
        let f = RealType::new("LibFahrenheit", Some(catalog::fahrenheit()), false).unwrap();
        let sum = Real::new(k, 300.0)
            .compute(&Real::new(f, 32.0), BinaryOp::Add, &mut names, ErrorMode::Independent)
            .unwrap();
        assert!((sum.value() - 573.15).abs() < 1e-9);
        assert_eq!(sum.unit(), Some(&catalog::kelvin()));
    }

    #[test]
    fn test_unit_conversions_compose() {
        let km = catalog::meter().scale(1000.0).unwrap();
        let cm = catalog::meter().scale(0.01).unwrap();
        let direct = cm.to_this(2.5, &km).unwrap();
        let via_meter = cm
            .to_this(catalog::meter().to_this(2.5, &km).unwrap(), &catalog::meter())
            .unwrap();
        assert!((direct - 250_000.0).abs() < 1e-6);
        assert!((direct - via_meter).abs() < 1e-6);
        assert!((km.to_this(direct, &cm).unwrap() - 2.5).abs() < 1e-12);

        let c = catalog::celsius();
        let f = catalog::fahrenheit();
        let through_kelvin = c
            .to_this(catalog::kelvin().to_this(98.6, &f).unwrap(), &catalog::kelvin())
            .unwrap();
        assert!((c.to_this(98.6, &f).unwrap() - through_kelvin).abs() < 1e-9);

        assert!(matches!(
            catalog::meter().to_this(1.0, &catalog::second()),
            Err(UnitFieldError::UnitConversion(_))
        ));
    }

    #[test]
    fn test_two_hundred_levels_pack_into_bytes() {
        let field = FlatField::builder(surface("LibLevels"), grid(4))
            .discretization(0, Discretization::linear(0.0, 199.0, 200).unwrap())
            .build()
            .unwrap();
        assert_eq!(field.storage_codes(), &[StorageCode::Byte]);
        let values: Vec<f64> = (0..16).map(|i| (i * 13) as f64).collect();
        field.set_samples(&[values.clone()], None).unwrap();
        assert_eq!(field.values().unwrap(), vec![values]);
    }

    #[test]
    fn test_missing_propagates_through_arithmetic() {
        let mut names = NamePool::with_registry(TypeRegistry::new());
        let empty = FlatField::new(surface("LibVoid"), grid(4)).unwrap();
        assert!(empty.is_missing());
        let full = FlatField::new(surface("LibFull"), grid(4)).unwrap();
        full.set_samples(&[vec![1.0; 16]], None).unwrap();
        let sum = full.compute(&empty, BinaryOp::Add, &mut names).unwrap();
        assert!(sum.is_missing());
        assert!(sum.values().unwrap()[0].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_resample_identity_and_refinement() {
        let coarse = grid(4);
        let field = FlatField::new(surface("LibPlane"), Arc::clone(&coarse)).unwrap();
        let samples = coarse.samples();
        let values: Vec<f64> = (0..16).map(|i| samples[0][i] + 2.0 * samples[1][i]).collect();
        field.set_samples(&[values.clone()], None).unwrap();

        let same = field
            .resample(&grid(4), SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
            .unwrap();
        assert_eq!(same.values().unwrap(), vec![values]);

        let fine = grid(7);
        let refined = field
            .resample(&fine, SamplingMode::WeightedAverage, ErrorMode::NoErrors)
            .unwrap();
        let positions = fine.samples();
        for (i, v) in refined.values().unwrap()[0].iter().enumerate() {
            let expected = positions[0][i] + 2.0 * positions[1][i];
            assert!((v - expected).abs() < 1e-9, "sample {i}: {v} != {expected}");
        }
    }

    #[test]
    fn test_type_text_round_trip() {
        let parsed = MathType::parse("((LibLat, LibLon) -> (LibHeat, LibWind))").unwrap();
        assert_eq!(parsed.to_string(), "((LibLat, LibLon) -> (LibHeat, LibWind))");
        assert_eq!(MathType::parse(&parsed.to_string()).unwrap(), parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let heat = RealType::new("LibSerdeHeat", Some(catalog::kelvin()), false).unwrap();
        let real = Real::new(heat, 288.0).with_error(0.5);
        let json = serde_json::to_string(&real).unwrap();
        let back: Real = serde_json::from_str(&json).unwrap();
        assert_eq!(back, real);

        let ft = MathType::parse("(LibSerdeTime -> LibSerdeHeat)").unwrap();
        let json = serde_json::to_string(&ft).unwrap();
        let back: MathType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ft);
    }
}
